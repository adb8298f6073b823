//! Symbol icon preloading.

use crate::{core::engine::MapEngine, layers::descriptor::SymbolIcon, Result};

/// Makes sure the engine has an image registered under `icon.image_id`.
///
/// Another registration may finish loading the same image while this one is
/// waiting, so presence is checked again after the load and the image is
/// only added if it is still missing.
pub async fn ensure_icon_image(engine: &dyn MapEngine, icon: &SymbolIcon) -> Result<()> {
    if engine.has_image(&icon.image_id) {
        return Ok(());
    }

    let image = engine.load_image(&icon.url).await?;

    if engine.has_image(&icon.image_id) {
        log::debug!("icon[{}]: registered by a concurrent load", icon.image_id);
        return Ok(());
    }

    engine.add_image(&icon.image_id, image, icon.options.as_ref())
}
