use crate::model::{DeploymentRecord, NamespaceRecord, ResourceKind};

/// Which row, if any, has its action menu open. A single controller per
/// view keeps at most one menu open: opening a row replaces whatever was
/// open before.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ActionMenu {
    open_key: Option<String>,
    highlighted: usize,
}

impl ActionMenu {
    pub fn toggle(&mut self, row_key: &str) {
        if self.open_key.as_deref() == Some(row_key) {
            self.open_key = None;
        } else {
            self.open_key = Some(row_key.to_string());
        }
        self.highlighted = 0;
    }

    pub fn open_key(&self) -> Option<&str> {
        self.open_key.as_deref()
    }

    pub fn is_open(&self, row_key: &str) -> bool {
        self.open_key.as_deref() == Some(row_key)
    }

    /// Closes the menu because one of its actions fired, returning the row
    /// it belonged to.
    pub fn fire(&mut self) -> Option<String> {
        self.highlighted = 0;
        self.open_key.take()
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    /// Keeps the highlight inside an action list that may have shrunk.
    pub fn clamp_highlight(&mut self, len: usize) {
        self.highlighted = self.highlighted.min(len.saturating_sub(1));
    }

    pub fn move_highlight(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.highlighted = 0;
            return;
        }
        let current = self.highlighted.min(len - 1) as isize;
        self.highlighted = (current + delta).rem_euclid(len as isize) as usize;
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MenuAction {
    ViewDeployments,
    ViewConfigs,
    CloneNamespace,
    UpdateDeployment,
    ScaleUp,
    UpdateConfigMap,
    UpdateSecret,
}

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::ViewDeployments => "View deployments",
            Self::ViewConfigs => "View configs",
            Self::CloneNamespace => "Clone namespace",
            Self::UpdateDeployment => "Update deployment",
            Self::ScaleUp => "Scale up",
            Self::UpdateConfigMap => "Update config map",
            Self::UpdateSecret => "Update secret",
        }
    }
}

/// Cloned namespaces can be browsed; others can only be cloned.
pub fn namespace_actions(namespace: &NamespaceRecord) -> Vec<MenuAction> {
    if namespace.is_cloned() {
        vec![MenuAction::ViewDeployments, MenuAction::ViewConfigs]
    } else {
        vec![MenuAction::CloneNamespace]
    }
}

pub fn deployment_actions(deployment: &DeploymentRecord) -> Vec<MenuAction> {
    let mut actions = vec![MenuAction::UpdateDeployment];
    if deployment.is_scaled_down() {
        actions.push(MenuAction::ScaleUp);
    }
    actions
}

pub fn key_value_actions(kind: ResourceKind) -> Vec<MenuAction> {
    match kind {
        ResourceKind::ConfigMaps => vec![MenuAction::UpdateConfigMap],
        ResourceKind::Secrets => vec![MenuAction::UpdateSecret],
        ResourceKind::Namespaces | ResourceKind::Deployments => Vec::new(),
    }
}
