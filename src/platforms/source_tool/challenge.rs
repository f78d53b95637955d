use std::time::Duration;

use chromiumoxide::layout::Point;
use chromiumoxide::Page;

use crate::core::browser::{eval_bool, js_string};

/// Horizontal offset of the checkbox inside the verification widget frame.
const CHECKBOX_OFFSET_X: f64 = 28.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Absent,
    Clicked,
    Unreachable,
}

fn visible_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0;
        }})()"#,
        sel = js_string(selector)
    )
}

pub async fn is_visible(page: &Page, selector: &str) -> bool {
    if selector.is_empty() {
        return false;
    }
    eval_bool(page, &visible_script(selector))
        .await
        .unwrap_or(false)
}

/// Clicks the checkbox of a verification widget when one is on the page.
///
/// The widget lives in a cross-origin frame, so the click goes to page
/// coordinates derived from the frame's box instead of a selector inside it.
pub async fn try_checkbox(page: &Page, selector: &str, settle: Duration) -> ChallengeOutcome {
    if !is_visible(page, selector).await {
        return ChallengeOutcome::Absent;
    }

    let frame = match page.find_element(selector).await {
        Ok(f) => f,
        Err(_) => return ChallengeOutcome::Unreachable,
    };
    let bbox = match frame.bounding_box().await {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!("[challenge] no box for {}: {}", selector, e);
            return ChallengeOutcome::Unreachable;
        }
    };

    let target = Point {
        x: bbox.x + CHECKBOX_OFFSET_X.min(bbox.width / 2.0),
        y: bbox.y + bbox.height / 2.0,
    };
    if let Err(e) = page.click(target).await {
        tracing::debug!("[challenge] click failed: {}", e);
        return ChallengeOutcome::Unreachable;
    }

    tracing::info!("[challenge] verification checkbox clicked");
    tokio::time::sleep(settle).await;
    ChallengeOutcome::Clicked
}
