//! Shared helpers for orchestrator integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dreamcatcher::generation::{
    GenerationClient, GenerationEvent, IMAGE_SLOT_COUNT, ImageData, RemoteError, Subscription,
    UnitKind,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// PNG-looking bytes tagged with the slot that produced them
pub fn png_for(slot: usize) -> ImageData {
    let mut bytes = PNG_HEADER.to_vec();
    bytes.push(slot as u8);
    ImageData::new(bytes)
}

/// Client with scripted outcomes whose units can be held until released
pub struct ScriptedClient {
    tags: Result<Vec<String>, RemoteError>,
    image_failures: HashMap<usize, RemoteError>,
    panicking_images: Vec<usize>,
    gates: Option<HashMap<UnitKind, Arc<Notify>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(tags: &[&str]) -> Self {
        Self {
            tags: Ok(tags.iter().map(|tag| tag.to_string()).collect()),
            image_failures: HashMap::new(),
            panicking_images: Vec::new(),
            gates: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_tags(mut self, error: RemoteError) -> Self {
        self.tags = Err(error);
        self
    }

    pub fn fail_image(mut self, slot: usize, error: RemoteError) -> Self {
        self.image_failures.insert(slot, error);
        self
    }

    pub fn panic_on_image(mut self, slot: usize) -> Self {
        self.panicking_images.push(slot);
        self
    }

    /// Hold every unit until `release` is called for it
    pub fn gated(mut self) -> Self {
        self.gates = Some(
            UnitKind::all()
                .into_iter()
                .map(|unit| (unit, Arc::new(Notify::new())))
                .collect(),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn release(&self, unit: UnitKind) {
        if let Some(gate) = self.gates.as_ref().and_then(|gates| gates.get(&unit)) {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, unit: UnitKind) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(gate) = self.gates.as_ref().and_then(|gates| gates.get(&unit)) {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate_tags(&self, _prompt: &str) -> Result<Vec<String>, RemoteError> {
        self.enter(UnitKind::Tags).await;
        self.tags.clone()
    }

    async fn generate_image(&self, _prompt: &str, slot: usize) -> Result<ImageData, RemoteError> {
        assert!(slot < IMAGE_SLOT_COUNT);
        self.enter(UnitKind::Image(slot)).await;
        if self.panicking_images.contains(&slot) {
            panic!("image generator blew up");
        }
        match self.image_failures.get(&slot) {
            Some(error) => Err(error.clone()),
            None => Ok(png_for(slot)),
        }
    }
}

/// Next event, failing the test instead of hanging
pub async fn next_event(subscription: &mut Subscription) -> GenerationEvent {
    tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream closed")
}

/// Release units one at a time, waiting for each one's event before the next
pub async fn release_in_order(
    client: &ScriptedClient,
    subscription: &mut Subscription,
    order: &[UnitKind],
) -> Vec<GenerationEvent> {
    let mut events = Vec::new();
    for unit in order {
        client.release(*unit);
        let event = next_event(subscription).await;
        assert_eq!(event.unit(), Some(*unit), "unexpected event {:?}", event);
        events.push(event);
    }
    events
}

pub fn all_units() -> Vec<UnitKind> {
    UnitKind::all()
}
