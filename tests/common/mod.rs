//! Shared fixtures for integration tests.
//!
//! Three small record types modeled on typical on-device apps: plants with
//! tags, care tasks referencing a plant, and recipes with a category and
//! numeric attributes.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stashdb::{Config, MemoryStorage, Record, RecordId, SyncMode, Timestamp};

// ============================================================================
// Plant
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub indoor: bool,
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Record for Plant {
    const COLLECTION: &'static str = "plants";

    fn id(&self) -> RecordId {
        self.id
    }

    fn touch(&mut self, now: Timestamp) {
        self.updated_at = now;
    }
}

pub fn plant(name: &str, tags: &[&str]) -> Plant {
    let now = Timestamp::now();
    Plant {
        id: RecordId::new(),
        name: name.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        indoor: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn plant_tags(p: &Plant) -> Vec<&str> {
    p.tags.iter().map(String::as_str).collect()
}

pub fn plant_name(p: &Plant) -> &str {
    &p.name
}

pub fn plant_name_field(p: &Plant) -> Option<&str> {
    Some(&p.name)
}

pub fn plant_indoor(p: &Plant) -> bool {
    p.indoor
}

pub fn plant_created(p: &Plant) -> Timestamp {
    p.created_at
}

// ============================================================================
// CareTask
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CareTask {
    pub id: RecordId,
    pub plant_id: Option<RecordId>,
    pub action: String,
    #[serde(default)]
    pub done: bool,
}

impl Record for CareTask {
    const COLLECTION: &'static str = "care_tasks";

    fn id(&self) -> RecordId {
        self.id
    }
}

pub fn care_task(plant_id: RecordId, action: &str) -> CareTask {
    CareTask {
        id: RecordId::new(),
        plant_id: Some(plant_id),
        action: action.to_string(),
        done: false,
    }
}

pub fn task_plant(t: &CareTask) -> Option<RecordId> {
    t.plant_id
}

// ============================================================================
// Recipe
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub cook_minutes: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub favourite: bool,
}

impl Record for Recipe {
    const COLLECTION: &'static str = "recipes";

    fn id(&self) -> RecordId {
        self.id
    }
}

pub fn recipe(title: &str, categories: &[&str], cook_minutes: Option<f64>, rating: Option<f64>) -> Recipe {
    Recipe {
        id: RecordId::new(),
        title: title.to_string(),
        notes: None,
        categories: categories.iter().map(|c| c.to_string()).collect(),
        cook_minutes,
        rating,
        favourite: false,
    }
}

pub fn recipe_title(r: &Recipe) -> &str {
    &r.title
}

pub fn recipe_title_field(r: &Recipe) -> Option<&str> {
    Some(&r.title)
}

pub fn recipe_notes(r: &Recipe) -> Option<&str> {
    r.notes.as_deref()
}

pub fn recipe_categories(r: &Recipe) -> Vec<&str> {
    r.categories.iter().map(String::as_str).collect()
}

pub fn recipe_minutes(r: &Recipe) -> Option<f64> {
    r.cook_minutes
}

pub fn recipe_rating(r: &Recipe) -> Option<f64> {
    r.rating
}

pub fn recipe_favourite(r: &Recipe) -> bool {
    r.favourite
}

// ============================================================================
// Helpers
// ============================================================================

/// Config for tests: skip fsync so the suite stays fast.
pub fn fast_config() -> Config {
    Config {
        sync_mode: SyncMode::Fast,
        ..Default::default()
    }
}

pub fn memory() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

pub fn db_path(dir: &Path) -> std::path::PathBuf {
    dir.join("stash.db")
}
