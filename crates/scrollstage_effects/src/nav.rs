//! Navigation bar and body class updates

use tracing::trace;

use scrollstage_core::{query_all, Document, Selector};

/// Nav class once the page is scrolled past the threshold
pub const SCROLLED_CLASS: &str = "is--scrolled";

/// Body class on every page except the home page
pub const PROJECT_CLASS: &str = "_on-project";

pub fn is_project_path(path: &str) -> bool {
    !matches!(path, "/" | "/index" | "")
}

/// Toggle the scrolled class on every nav; returns whether it is set
pub fn update_nav_state(doc: &mut dyn Document, nav: &Selector, threshold: f32) -> bool {
    let scrolled = doc.scroll_y() > threshold;
    for el in query_all(doc, nav) {
        if scrolled {
            doc.add_class(el, SCROLLED_CLASS);
        } else {
            doc.remove_class(el, SCROLLED_CLASS);
        }
    }
    scrolled
}

/// Sync the project class with the current path; returns whether it is set
pub fn update_body_class(doc: &mut dyn Document) -> bool {
    let on_project = is_project_path(doc.path());
    let body = doc.body();
    if on_project {
        doc.add_class(body, PROJECT_CLASS);
    } else {
        doc.remove_class(body, PROJECT_CLASS);
    }
    trace!(path = doc.path(), on_project, "body class updated");
    on_project
}
