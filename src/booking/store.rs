//! Appointment persistence.

use super::types::Appointment;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Storage for submitted appointments
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(&self, appointment: Appointment) -> Result<Appointment>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>>;

    /// All appointments, oldest first.
    async fn list(&self) -> Result<Vec<Appointment>>;
}

/// Process-local appointment store
#[derive(Debug, Clone, Default)]
pub struct InMemoryAppointmentStore {
    appointments: Arc<DashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, appointment: Appointment) -> Result<Appointment> {
        self.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.appointments.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Appointment>> {
        let mut all: Vec<Appointment> = self
            .appointments
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|a| a.created_at);
        Ok(all)
    }
}
