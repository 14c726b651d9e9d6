//! Layer change notifications

use std::collections::HashMap;

use crate::grid::TileInfo;
use crate::types::{Bounds, Size};

use super::{Layer, LayerError};

/// Direction of a history step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryDirection {
    Undo,
    Redo,
}

/// Events emitted by a [`Layer`]
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    /// Geometry changed; tiles were reallocated.
    Resized { size: Size, tiles: Vec<TileInfo> },
    /// A snapshot was pushed onto the undo stack.
    HistoryRegistered {
        bounds: Bounds,
        context: Option<String>,
    },
    /// Undo or redo rewrote pixels.
    HistoryApplied {
        bounds: Bounds,
        direction: HistoryDirection,
    },
}

impl LayerEvent {
    pub fn kind(&self) -> LayerEventKind {
        match self {
            LayerEvent::Resized { .. } => LayerEventKind::Resized,
            LayerEvent::HistoryRegistered { .. } => LayerEventKind::HistoryRegistered,
            LayerEvent::HistoryApplied { .. } => LayerEventKind::HistoryApplied,
        }
    }
}

/// Event tag used to subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerEventKind {
    Resized,
    HistoryRegistered,
    HistoryApplied,
}

/// Subscription handle returned by [`Layer::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type LayerListener = Box<dyn FnMut(&LayerEvent) + Send>;

/// Tag to subscriber-list map
#[derive(Default)]
pub(crate) struct EventBus {
    next_id: u64,
    listeners: HashMap<LayerEventKind, Vec<(ListenerId, LayerListener)>>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self, kind: LayerEventKind, listener: LayerListener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.entry(kind).or_default().push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        for list in self.listeners.values_mut() {
            if let Some(pos) = list.iter().position(|(entry, _)| *entry == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub(crate) fn emit(&mut self, event: &LayerEvent) {
        if let Some(list) = self.listeners.get_mut(&event.kind()) {
            for (_, listener) in list.iter_mut() {
                listener(event);
            }
        }
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl Layer {
    /// Register a listener for one kind of event
    pub fn subscribe<F>(&mut self, kind: LayerEventKind, listener: F) -> Result<ListenerId, LayerError>
    where
        F: FnMut(&LayerEvent) + Send + 'static,
    {
        self.ensure_alive()?;
        Ok(self.events.subscribe(kind, Box::new(listener)))
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }

    pub(crate) fn emit(&mut self, event: &LayerEvent) {
        self.events.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::gpu::GpuContext;
    use crate::layer::LayerInit;

    #[test]
    fn test_resize_event() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(4, 4)).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        layer
            .subscribe(LayerEventKind::Resized, move |event| {
                sink.lock().unwrap().push(event.clone());
            })
            .unwrap();

        layer.resize_clear(6, 2).unwrap();
        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            LayerEvent::Resized { size, tiles } => {
                assert_eq!(*size, Size::new(6, 2));
                assert_eq!(tiles.len(), 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_unsubscribe() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(4, 4)).unwrap();
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        let id = layer
            .subscribe(LayerEventKind::Resized, move |_| *sink.lock().unwrap() += 1)
            .unwrap();
        assert_eq!(layer.listener_count(), 1);

        layer.resize_clear(5, 5).unwrap();
        assert!(layer.unsubscribe(id));
        assert!(!layer.unsubscribe(id));
        layer.resize_clear(6, 6).unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_listeners_filtered_by_kind() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(4, 4)).unwrap();
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        layer
            .subscribe(LayerEventKind::HistoryApplied, move |_| *sink.lock().unwrap() += 1)
            .unwrap();
        layer.resize_clear(8, 8).unwrap();
        assert_eq!(*count.lock().unwrap(), 0);
    }
}
