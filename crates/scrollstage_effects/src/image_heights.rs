//! Stack image height fix-up
//!
//! Stack wrappers may collapse to zero height until their image loads.
//! Once every stack image is complete, collapsed wrappers take their
//! image's height and the triggers are re-measured.

use serde::Serialize;
use tracing::debug;

use scrollstage_core::{props, query_all, query_within};

use crate::EffectCx;

/// Result of a height check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status")]
pub enum ImageHeightStatus {
    /// The page has no stack images
    NoImages,
    /// Some images are still loading
    Pending { loading: usize },
    /// Heights were fixed and a forced refresh ran
    Applied { fixed: usize },
}

/// Fix collapsed stack wrappers once all stack images have loaded
pub fn ensure_image_heights(cx: &mut EffectCx<'_>) -> ImageHeightStatus {
    let images = query_all(cx.document, &cx.selectors.stack_image);
    if images.is_empty() {
        return ImageHeightStatus::NoImages;
    }

    let loading = images
        .iter()
        .filter(|&&img| !cx.document.image_complete(img))
        .count();
    if loading > 0 {
        debug!(loading, "waiting for stack images");
        return ImageHeightStatus::Pending { loading };
    }

    let mut fixed = 0;
    for wrap in query_all(cx.document, &cx.selectors.stack_item) {
        let collapsed = cx.document.rect(wrap).is_some_and(|rect| rect.height <= 0.0);
        if !collapsed {
            continue;
        }
        let height = query_within(cx.document, wrap, &cx.selectors.stack_image)
            .first()
            .and_then(|&img| cx.document.rect(img))
            .map(|rect| rect.height);
        if let Some(height) = height.filter(|h| *h > 0.0) {
            cx.document.set_style(wrap, props::HEIGHT, height);
            fixed += 1;
        }
    }

    cx.registry.refresh(cx.document, cx.animator, true);
    debug!(images = images.len(), fixed, "stack image heights ensured");
    ImageHeightStatus::Applied { fixed }
}
