//! JNI bindings for Android.
//!
//! These functions are called from Kotlin via the JNI bridge.

use jni::objects::{JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;

use crate::{justify_json, layout_page_json};

fn optional_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    if value.is_null() {
        None
    } else {
        env.get_string(value).ok().map(|s| s.into())
    }
}

fn into_jstring(env: &mut JNIEnv, result: crate::Result<String>) -> jstring {
    match result {
        Ok(json) => match env.new_string(&json) {
            Ok(js) => js.into_raw(),
            Err(_) => std::ptr::null_mut(),
        },
        Err(e) => {
            log::error!("layout failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Justify one JSON-encoded system.
///
/// Called from Kotlin as:
///   external fun justifySystem(systemJson: String, configJson: String?): String?
#[no_mangle]
pub extern "system" fn Java_com_scorejustify_ScoreJustify_justifySystem(
    mut env: JNIEnv,
    _class: JClass,
    system_json: JString,
    config_json: JString,
) -> jstring {
    let system: String = match env.get_string(&system_json) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };
    let config = optional_string(&mut env, &config_json);
    let result = justify_json(&system, config.as_deref());
    into_jstring(&mut env, result)
}

/// Lay out one JSON-encoded page.
///
/// Called from Kotlin as:
///   external fun layoutPage(pageJson: String, configJson: String?): String?
#[no_mangle]
pub extern "system" fn Java_com_scorejustify_ScoreJustify_layoutPage(
    mut env: JNIEnv,
    _class: JClass,
    page_json: JString,
    config_json: JString,
) -> jstring {
    let page: String = match env.get_string(&page_json) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };
    let config = optional_string(&mut env, &config_json);
    let result = layout_page_json(&page, config.as_deref());
    into_jstring(&mut env, result)
}
