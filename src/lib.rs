//! scorejustify: layout engine for generated music scores.
//!
//! Takes the symbols of a system (already measured by the notation layer,
//! grouped per voice and staff) and moves them to their final positions:
//! horizontally in proportion to musical time with collisions traded away,
//! vertically with staves packed as closely as their outlines allow.
//!
//! # Example
//! ```no_run
//! use scorejustify::{justify_system, LayoutConfig, System};
//!
//! let mut system: System = serde_json::from_str("{\"staves\": []}").unwrap();
//! let report = justify_system(&mut system, 0, &LayoutConfig::default()).unwrap();
//! println!("Unresolved: {:?}", report.diagnostics);
//! ```

pub mod config;
pub mod error;
pub mod justify;
pub mod model;

#[cfg(target_os = "android")]
pub mod android;

use serde::{Deserialize, Serialize};

pub use config::LayoutConfig;
pub use error::{LayoutError, Result};
pub use justify::{
    justify_system, layout_page, rejustify_system, Diagnostic, JustifyReport, MomentSummary,
    PageReport, VoiceGroup,
};
pub use model::*;

/// A system after justification, together with its report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JustifiedSystem {
    pub system: System,
    pub report: JustifyReport,
}

/// A page after layout, together with its report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaidOutPage {
    pub page: Page,
    pub report: PageReport,
}

fn config_from_json(config_json: Option<&str>) -> Result<LayoutConfig> {
    match config_json {
        Some(json) if !json.trim().is_empty() => LayoutConfig::from_json(json),
        _ => Ok(LayoutConfig::default()),
    }
}

/// Justify a JSON-encoded system.
/// Returns a JSON [`JustifiedSystem`]. Pass `None` to use the default config.
pub fn justify_json(system_json: &str, config_json: Option<&str>) -> Result<String> {
    let config = config_from_json(config_json)?;
    let mut system: System = serde_json::from_str(system_json)?;
    let report = justify_system(&mut system, 0, &config)?;
    Ok(serde_json::to_string(&JustifiedSystem { system, report })?)
}

/// Lay out a JSON-encoded page.
/// Returns a JSON [`LaidOutPage`]. Pass `None` to use the default config.
pub fn layout_page_json(page_json: &str, config_json: Option<&str>) -> Result<String> {
    let config = config_from_json(config_json)?;
    let mut page: Page = serde_json::from_str(page_json)?;
    let report = layout_page(&mut page, &config)?;
    Ok(serde_json::to_string(&LaidOutPage { page, report })?)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI: for iOS (static library) and Android (JNI)
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Lay out a JSON-encoded page and return the result as a JSON C string.
/// The caller must free the returned string with `scorejustify_free_string`.
/// Returns null on any error.
///
/// # Safety
/// `page_json` must be a valid null-terminated UTF-8 C string.
/// `config_json` may be null.
#[no_mangle]
pub unsafe extern "C" fn scorejustify_layout_page(
    page_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    if page_json.is_null() {
        return std::ptr::null_mut();
    }
    let page = match unsafe { CStr::from_ptr(page_json) }.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };
    let config = if config_json.is_null() {
        None
    } else {
        unsafe { CStr::from_ptr(config_json) }.to_str().ok()
    };

    match layout_page_json(page, config) {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(e) => {
            log::error!("page layout failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Free a string previously returned by scorejustify functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a scorejustify function, or null.
#[no_mangle]
pub unsafe extern "C" fn scorejustify_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
