//! Process-wide stylesheet registry.
//!
//! The engine stylesheet is a document resource shared by every mounted map.
//! It is inserted once per identifier and never torn down; later map handles
//! await the same load instead of inserting it again. A failed load is
//! forgotten so the next handle can retry.

use std::sync::{Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;

use crate::{core::engine::EngineFactory, prelude::HashMap, MapError, Result};

type StylesheetLoad = Shared<BoxFuture<'static, std::result::Result<(), String>>>;

static STYLESHEETS: Lazy<Mutex<HashMap<String, StylesheetLoad>>> =
    Lazy::new(|| Mutex::new(HashMap::default()));

fn registry() -> MutexGuard<'static, HashMap<String, StylesheetLoad>> {
    STYLESHEETS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ensures the stylesheet registered under `id` has loaded, inserting it via
/// `factory` if no handle has done so yet.
pub async fn ensure_loaded(factory: &dyn EngineFactory, id: &str, url: &str) -> Result<()> {
    let load = registry()
        .entry(id.to_string())
        .or_insert_with(|| {
            log::debug!("stylesheet[{id}]: inserting {url}");
            factory
                .load_stylesheet(id, url)
                .map(|result| result.map_err(|e| e.to_string()))
                .boxed()
                .shared()
        })
        .clone();

    match load.clone().await {
        Ok(()) => Ok(()),
        Err(reason) => {
            let mut sheets = registry();
            if sheets.get(id).is_some_and(|current| current.ptr_eq(&load)) {
                sheets.remove(id);
            }
            Err(MapError::Stylesheet {
                url: url.to_string(),
                reason,
            })
        }
    }
}

/// Whether a stylesheet load has been started (or finished) for `id`.
pub fn is_registered(id: &str) -> bool {
    registry().contains_key(id)
}
