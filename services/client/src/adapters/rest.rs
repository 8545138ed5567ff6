//! services/client/src/adapters/rest.rs
//!
//! This module contains the data-service adapter, which is the concrete
//! implementation of the `DataService` port from the `core` crate. It speaks
//! the backend's PostgREST-style JSON API over `reqwest`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guestgo_core::domain::{Gate, NewGate, NewPlace, NewVisit, Place, Role, VisitQrPayload};
use guestgo_core::ports::{DataService, PortError, PortResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

const VISIT_SELECT: &str =
    "id,visitor_name,visitor_email,visit_date,purpose,status,created_at,\
     visit_places(status,place:places(id,name,location,status))";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A REST adapter that implements the `DataService` port.
#[derive(Clone)]
pub struct RestDataAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestDataAdapter {
    /// Creates a new `RestDataAdapter` against the backend's base URL.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> PortResult<Vec<T>> {
        let response = self
            .http
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| PortError::Provider(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortError::Provider(format!(
                "{} query returned {}",
                table,
                response.status()
            )));
        }
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    /// Inserts one row and returns the created record.
    async fn insert_row<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &serde_json::Value,
    ) -> PortResult<T> {
        let response = self
            .http
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Provider(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortError::Provider(format!(
                "{} insert returned {}",
                table,
                response.status()
            )));
        }
        let mut rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        rows.pop()
            .ok_or_else(|| PortError::Unexpected(format!("{} insert returned no row", table)))
    }

    /// Inserts rows without asking for the representation back.
    async fn insert_rows(&self, table: &str, body: &serde_json::Value) -> PortResult<()> {
        let response = self
            .http
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Provider(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortError::Provider(format!(
                "{} insert returned {}",
                table,
                response.status()
            )));
        }
        Ok(())
    }

    async fn patch_row(
        &self,
        table: &str,
        id: &str,
        body: &serde_json::Value,
    ) -> PortResult<()> {
        let response = self
            .http
            .patch(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("id", format!("eq.{}", id))])
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Provider(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortError::Provider(format!(
                "{} update returned {}",
                table,
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete_row(&self, table: &str, id: &str) -> PortResult<()> {
        let response = self
            .http
            .delete(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await
            .map_err(|e| PortError::Provider(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortError::Provider(format!(
                "{} delete returned {}",
                table,
                response.status()
            )));
        }
        Ok(())
    }
}

//=========================================================================================
// "Impure" Backend Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct RoleRecord {
    role: String,
}

#[derive(Serialize, Deserialize)]
struct PlaceRecord {
    id: String,
    name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    status: String,
}

impl PlaceRecord {
    fn to_domain(self) -> Place {
        Place {
            place_id: self.id,
            place_name: self.name,
            place_location: self.location,
            status: self.status,
        }
    }
}

#[derive(Deserialize)]
struct GateRecord {
    id: String,
    name: String,
    description: Option<String>,
    location: Option<String>,
    gate_type: guestgo_core::domain::GateType,
    status: guestgo_core::domain::GateStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GateRecord {
    fn to_domain(self) -> Gate {
        Gate {
            gate_id: self.id,
            gate_name: self.name,
            gate_description: self.description,
            gate_location: self.location,
            gate_type: self.gate_type,
            status: self.status,
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
struct VisitPlaceRecord {
    #[serde(default)]
    status: String,
    place: Option<PlaceRecord>,
}

#[derive(Deserialize)]
struct VisitRecord {
    id: String,
    visitor_name: String,
    #[serde(default)]
    visitor_email: String,
    visit_date: String,
    #[serde(default)]
    purpose: String,
    #[serde(default)]
    status: String,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    visit_places: Vec<VisitPlaceRecord>,
}

impl VisitRecord {
    fn to_domain(self) -> VisitQrPayload {
        let places = self
            .visit_places
            .into_iter()
            .filter_map(|join| {
                join.place.map(|place| {
                    let mut place = place.to_domain();
                    // The per-visit status wins over the place's own status.
                    if !join.status.is_empty() {
                        place.status = join.status;
                    }
                    place
                })
            })
            .collect();
        VisitQrPayload {
            visit_id: self.id,
            visitor_name: self.visitor_name,
            visitor_email: self.visitor_email,
            visit_date: self.visit_date,
            purpose: self.purpose,
            places,
            status: self.status,
            scheduled_at: self
                .created_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

//=========================================================================================
// `DataService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DataService for RestDataAdapter {
    async fn fetch_role(&self, user_id: Uuid) -> PortResult<Option<Role>> {
        let rows: Vec<RoleRecord> = self
            .fetch_rows(
                "user_roles",
                &[
                    ("select", "role".to_string()),
                    ("user_id", format!("eq.{}", user_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        match rows.into_iter().next() {
            None => Ok(None),
            Some(record) => match Role::from_str(&record.role) {
                Ok(role) => Ok(Some(role)),
                Err(e) => {
                    // An unknown role value falls back to the role-absent
                    // behavior rather than locking the user out.
                    warn!("Ignoring unknown role for {}: {}", user_id, e);
                    Ok(None)
                }
            },
        }
    }

    async fn resolve_visit(&self, visit_id: &str) -> PortResult<VisitQrPayload> {
        let rows: Vec<VisitRecord> = self
            .fetch_rows(
                "visits",
                &[
                    ("select", VISIT_SELECT.to_string()),
                    ("id", format!("eq.{}", visit_id)),
                ],
            )
            .await?;
        rows.into_iter()
            .next()
            .map(VisitRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("visit {}", visit_id)))
    }

    async fn create_visit(&self, visit: NewVisit) -> PortResult<VisitQrPayload> {
        let row: VisitRecord = self
            .insert_row(
                "visits",
                &json!({
                    "visitor_name": visit.visitor_name,
                    "visitor_email": visit.visitor_email,
                    "visit_date": visit.visit_date,
                    "purpose": visit.purpose,
                    "status": "pending",
                }),
            )
            .await?;

        if !visit.place_ids.is_empty() {
            let joins: Vec<serde_json::Value> = visit
                .place_ids
                .iter()
                .map(|place_id| {
                    json!({
                        "visit_id": row.id,
                        "place_id": place_id,
                        "status": "pending",
                    })
                })
                .collect();
            self.insert_rows("visit_places", &serde_json::Value::Array(joins))
                .await?;
        }

        self.resolve_visit(&row.id).await
    }

    async fn list_visits_for(&self, visitor_email: &str) -> PortResult<Vec<VisitQrPayload>> {
        let rows: Vec<VisitRecord> = self
            .fetch_rows(
                "visits",
                &[
                    ("select", VISIT_SELECT.to_string()),
                    ("visitor_email", format!("eq.{}", visitor_email)),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(VisitRecord::to_domain).collect())
    }

    async fn list_places(&self) -> PortResult<Vec<Place>> {
        let rows: Vec<PlaceRecord> = self
            .fetch_rows("places", &[("order", "name.asc".to_string())])
            .await?;
        Ok(rows.into_iter().map(PlaceRecord::to_domain).collect())
    }

    async fn create_place(&self, place: NewPlace) -> PortResult<Place> {
        let row: PlaceRecord = self
            .insert_row(
                "places",
                &json!({
                    "name": place.place_name,
                    "location": place.place_location,
                    "status": place.status,
                }),
            )
            .await?;
        Ok(row.to_domain())
    }

    async fn update_place(&self, place: &Place) -> PortResult<()> {
        self.patch_row(
            "places",
            &place.place_id,
            &json!({
                "name": place.place_name,
                "location": place.place_location,
                "status": place.status,
            }),
        )
        .await
    }

    async fn delete_place(&self, place_id: &str) -> PortResult<()> {
        self.delete_row("places", place_id).await
    }

    async fn list_gates(&self) -> PortResult<Vec<Gate>> {
        let rows: Vec<GateRecord> = self
            .fetch_rows("gates", &[("order", "name.asc".to_string())])
            .await?;
        Ok(rows.into_iter().map(GateRecord::to_domain).collect())
    }

    async fn create_gate(&self, gate: NewGate) -> PortResult<Gate> {
        let row: GateRecord = self
            .insert_row(
                "gates",
                &json!({
                    "name": gate.gate_name,
                    "description": gate.gate_description,
                    "location": gate.gate_location,
                    "gate_type": gate.gate_type,
                    "status": gate.status,
                }),
            )
            .await?;
        Ok(row.to_domain())
    }

    async fn update_gate(&self, gate: &Gate) -> PortResult<()> {
        self.patch_row(
            "gates",
            &gate.gate_id,
            &json!({
                "name": gate.gate_name,
                "description": gate.gate_description,
                "location": gate.gate_location,
                "gate_type": gate.gate_type,
                "status": gate.status,
            }),
        )
        .await
    }

    async fn delete_gate(&self, gate_id: &str) -> PortResult<()> {
        self.delete_row("gates", gate_id).await
    }

    async fn log_action(&self, action_kind: &str, details: &str) -> PortResult<()> {
        self.insert_rows(
            "logs",
            &json!({
                "action": action_kind,
                "details": details,
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestgo_core::domain::{GateStatus, GateType};

    #[test]
    fn visit_record_maps_join_rows_into_ordered_places() {
        let value = json!({
            "id": "v1",
            "visitor_name": "Ada Vance",
            "visit_date": "2024-06-12",
            "created_at": "2024-06-01T09:30:00Z",
            "visit_places": [
                { "status": "approved", "place": { "id": "p1", "name": "Lobby" } },
                { "status": "", "place": { "id": "p2", "name": "Lab", "location": "B2", "status": "open" } },
                { "status": "pending", "place": null }
            ]
        });
        let record: VisitRecord = serde_json::from_value(value).unwrap();
        let payload = record.to_domain();

        assert_eq!(payload.visit_id, "v1");
        assert_eq!(payload.scheduled_at, "2024-06-01T09:30:00+00:00");
        // The dangling join row is dropped; order is preserved.
        assert_eq!(payload.places.len(), 2);
        assert_eq!(payload.places[0].place_id, "p1");
        assert_eq!(payload.places[0].status, "approved");
        // An empty join status leaves the place's own status in place.
        assert_eq!(payload.places[1].status, "open");
    }

    #[test]
    fn gate_record_converts_timestamps_and_enums() {
        let value = json!({
            "id": "g1",
            "name": "North Gate",
            "description": null,
            "location": "Perimeter",
            "gate_type": "both",
            "status": "closed",
            "created_at": "2024-05-01T08:00:00Z",
            "updated_at": "2024-05-02T08:00:00Z"
        });
        let record: GateRecord = serde_json::from_value(value).unwrap();
        let gate = record.to_domain();

        assert_eq!(gate.gate_type, GateType::Both);
        assert_eq!(gate.status, GateStatus::Closed);
        assert_eq!(gate.gate_description, None);
        assert_eq!(gate.gate_location.as_deref(), Some("Perimeter"));
        assert!(gate.created_at.starts_with("2024-05-01"));
    }
}
