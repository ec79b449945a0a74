//! Per-resource collection state and its load/mutate orchestration.
//!
//! A store never patches its items from a write response: every successful
//! write is followed by a full reload with the parameters of the last load.
//! Loads are tagged with a sequence number and only the completion of the
//! most recently issued load is accepted.

use crate::dispatch::{self, OperationId, ParamBag, RequestDescriptor};
use crate::error::{ClientError, TransportError};
use crate::model::{ColumnSpec, Record, ResourceKind};
use crate::transport::Transport;
use chrono::{DateTime, Local};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(ClientError),
}

#[derive(Debug, Clone)]
pub struct CollectionState<T> {
    pub items: Vec<T>,
    pub phase: LoadPhase,
    pub loaded_at: Option<DateTime<Local>>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            phase: LoadPhase::Idle,
            loaded_at: None,
        }
    }
}

impl<T> CollectionState<T> {
    pub fn loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadTicket {
    pub seq: u64,
    pub request: RequestDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutateTicket {
    pub operation: OperationId,
    pub request: RequestDescriptor,
}

#[derive(Debug)]
pub struct CollectionStore<T> {
    state: CollectionState<T>,
    last_params: Option<ParamBag>,
    issued: u64,
}

impl<T: Record> Default for CollectionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> CollectionStore<T> {
    pub fn new() -> Self {
        Self {
            state: CollectionState::default(),
            last_params: None,
            issued: 0,
        }
    }

    pub fn state(&self) -> &CollectionState<T> {
        &self.state
    }

    pub fn items(&self) -> &[T] {
        &self.state.items
    }

    pub fn loading(&self) -> bool {
        self.state.loading()
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.state.phase
    }

    pub fn last_params(&self) -> Option<&ParamBag> {
        self.last_params.as_ref()
    }

    /// Enters `Loading` and returns the request to send. Nothing changes when
    /// the parameters cannot produce a request.
    pub fn begin_load(&mut self, params: ParamBag) -> Result<LoadTicket, ClientError> {
        let operation = T::KIND.list_operation();
        let request = dispatch::try_build(operation, &params)
            .inspect_err(|error| warn!(%operation, "load not issued: {error}"))?;

        self.issued += 1;
        self.last_params = Some(params);
        self.state.phase = LoadPhase::Loading;
        debug!(kind = ?T::KIND, seq = self.issued, %request, "load issued");

        Ok(LoadTicket {
            seq: self.issued,
            request,
        })
    }

    /// Applies a load completion. Returns false when the completion belongs to
    /// a load that has since been superseded.
    pub fn complete_load(&mut self, seq: u64, result: Result<Value, TransportError>) -> bool {
        if seq != self.issued {
            debug!(
                kind = ?T::KIND,
                seq,
                latest = self.issued,
                "discarding stale load completion"
            );
            return false;
        }

        match result {
            Ok(payload) => {
                self.state.items = normalize::<T>(payload);
                self.state.phase = LoadPhase::Loaded;
                self.state.loaded_at = Some(Local::now());
            }
            Err(error) => {
                warn!(kind = ?T::KIND, seq, "load failed: {error}");
                self.state.phase = LoadPhase::Failed(error.into());
            }
        }
        true
    }

    pub fn begin_mutate(
        &self,
        operation: OperationId,
        params: &ParamBag,
    ) -> Result<MutateTicket, ClientError> {
        if !operation.is_write() {
            let error = ClientError::UnmappedOperation(format!("{operation} as a write"));
            warn!("{error}");
            return Err(error);
        }
        let request = dispatch::try_build(operation, params)
            .inspect_err(|error| warn!(%operation, "write not issued: {error}"))?;
        debug!(kind = ?T::KIND, %request, "write issued");
        Ok(MutateTicket { operation, request })
    }

    /// Applies a write completion. A successful write always yields a reload
    /// with the last read parameters; a failed write leaves the state as is.
    pub fn complete_mutate(
        &mut self,
        operation: OperationId,
        result: Result<Value, TransportError>,
    ) -> Result<Option<LoadTicket>, ClientError> {
        if let Err(error) = result {
            warn!(%operation, "write failed: {error}");
            return Err(error.into());
        }

        let Some(params) = self.last_params.clone() else {
            debug!(%operation, kind = ?T::KIND, "write succeeded before any load, nothing to refresh");
            return Ok(None);
        };
        self.begin_load(params).map(Some)
    }

    pub async fn load(
        &mut self,
        transport: &dyn Transport,
        params: ParamBag,
    ) -> Result<bool, ClientError> {
        let ticket = self.begin_load(params)?;
        let result = transport.execute(&ticket.request).await;
        Ok(self.complete_load(ticket.seq, result))
    }

    /// Sends the write and, on success, reloads before returning.
    pub async fn mutate(
        &mut self,
        transport: &dyn Transport,
        operation: OperationId,
        params: ParamBag,
    ) -> Result<(), ClientError> {
        let ticket = self.begin_mutate(operation, &params)?;
        let result = transport.execute(&ticket.request).await;
        if let Some(reload) = self.complete_mutate(operation, result)? {
            let result = transport.execute(&reload.request).await;
            self.complete_load(reload.seq, result);
        }
        Ok(())
    }

    /// Discards the collection. Completions of loads issued before the reset
    /// are ignored.
    pub fn reset(&mut self) {
        self.issued += 1;
        self.state = CollectionState::default();
        self.last_params = None;
    }
}

/// Accepts a bare array or an object carrying the array under the kind's
/// envelope field. Anything else is an empty collection.
pub fn normalize<T: Record>(payload: Value) -> Vec<T> {
    let field = T::KIND.envelope_field();
    let entries = match payload {
        Value::Array(entries) => entries,
        Value::Object(mut fields) => match fields.remove(field) {
            Some(Value::Array(entries)) => entries,
            _ => {
                let error =
                    ClientError::MalformedResponse(format!("object without a '{field}' list"));
                debug!(kind = ?T::KIND, "{error}");
                return Vec::new();
            }
        },
        other => {
            let error = ClientError::MalformedResponse(format!("unexpected payload {other}"));
            debug!(kind = ?T::KIND, "{error}");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<T>(entry) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(kind = ?T::KIND, "skipping malformed record: {error}");
                None
            }
        })
        .collect()
}

/// Kind-erased view of a store, used by screens that handle every resource
/// the same way.
pub trait CollectionHandle: Send {
    fn kind(&self) -> ResourceKind;
    fn phase(&self) -> &LoadPhase;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn loaded_at(&self) -> Option<DateTime<Local>>;
    fn row_key(&self, index: usize) -> Option<String>;
    fn row_cells(&self, index: usize, columns: &[ColumnSpec]) -> Vec<String>;
    fn begin_load(&mut self, params: ParamBag) -> Result<LoadTicket, ClientError>;
    fn complete_load(&mut self, seq: u64, result: Result<Value, TransportError>) -> bool;
    fn begin_mutate(
        &self,
        operation: OperationId,
        params: &ParamBag,
    ) -> Result<MutateTicket, ClientError>;
    fn complete_mutate(
        &mut self,
        operation: OperationId,
        result: Result<Value, TransportError>,
    ) -> Result<Option<LoadTicket>, ClientError>;
    fn reset(&mut self);
}

impl<T: Record> CollectionHandle for CollectionStore<T> {
    fn kind(&self) -> ResourceKind {
        T::KIND
    }

    fn phase(&self) -> &LoadPhase {
        &self.state.phase
    }

    fn len(&self) -> usize {
        self.state.items.len()
    }

    fn loaded_at(&self) -> Option<DateTime<Local>> {
        self.state.loaded_at
    }

    fn row_key(&self, index: usize) -> Option<String> {
        self.state.items.get(index).map(|item| item.row_key())
    }

    fn row_cells(&self, index: usize, columns: &[ColumnSpec]) -> Vec<String> {
        let Some(item) = self.state.items.get(index) else {
            return Vec::new();
        };
        columns
            .iter()
            .map(|column| {
                if !column.sortable {
                    return String::new();
                }
                item.cell(column.accessor)
                    .filter(|value| !value.is_empty())
                    .unwrap_or_else(|| "-".to_string())
            })
            .collect()
    }

    fn begin_load(&mut self, params: ParamBag) -> Result<LoadTicket, ClientError> {
        CollectionStore::begin_load(self, params)
    }

    fn complete_load(&mut self, seq: u64, result: Result<Value, TransportError>) -> bool {
        CollectionStore::complete_load(self, seq, result)
    }

    fn begin_mutate(
        &self,
        operation: OperationId,
        params: &ParamBag,
    ) -> Result<MutateTicket, ClientError> {
        CollectionStore::begin_mutate(self, operation, params)
    }

    fn complete_mutate(
        &mut self,
        operation: OperationId,
        result: Result<Value, TransportError>,
    ) -> Result<Option<LoadTicket>, ClientError> {
        CollectionStore::complete_mutate(self, operation, result)
    }

    fn reset(&mut self) {
        CollectionStore::reset(self)
    }
}
