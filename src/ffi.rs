//! FFI bindings for Nexus Flux
//!
//! This module provides C-compatible functions for embedding the engine in a
//! host UI. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `nexus_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::clock::SystemClock;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::pipeline::{apply_signal, replay_trace};
use crate::profile::{MemoryStorage, ProfileStore};
use crate::ranking::{build_prompt, decode_generated};
use crate::session::{CloseReason, SessionController};
use crate::signal::UiSignal;
use crate::types::UserProfile;
use chrono::Utc;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Config from an optional JSON string; NULL means defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<EngineConfig, EngineError> {
    if config_json.is_null() {
        return Ok(EngineConfig::default());
    }
    match cstr_to_string(config_json) {
        Some(json) => EngineConfig::from_json(&json),
        None => Err(EngineError::Config("config is not valid UTF-8".to_string())),
    }
}

/// Report a result as a C string, or NULL with the last error set
fn finish(result: Result<String, EngineError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Replay a signal trace and return the resulting profile as JSON.
///
/// # Safety
/// - `trace` must be a valid null-terminated C string (JSON array or NDJSON).
/// - `profile_json` and `config_json` may be NULL, otherwise valid C strings.
/// - Returns a newly allocated string that must be freed with `nexus_free_string`.
/// - Returns NULL on error; call `nexus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nexus_replay_trace(
    trace: *const c_char,
    profile_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let trace_str = match cstr_to_string(trace) {
        Some(s) => s,
        None => {
            set_last_error("Invalid trace string pointer");
            return ptr::null_mut();
        }
    };
    let profile_str = cstr_to_string(profile_json);

    let config = match config_from_ptr(config_json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    finish(
        replay_trace(&trace_str, profile_str.as_deref(), &config)
            .and_then(|outcome| Ok(serde_json::to_string(&outcome.profile)?)),
    )
}

/// Build the content-generation prompt for a profile.
///
/// # Safety
/// - `profile_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `nexus_free_string`.
/// - Returns NULL on error; call `nexus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nexus_build_prompt(profile_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(profile_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid profile string pointer");
            return ptr::null_mut();
        }
    };

    finish(
        serde_json::from_str::<UserProfile>(&json_str)
            .map(|profile| build_prompt(&profile))
            .map_err(EngineError::from),
    )
}

/// Decode a generator response into content items JSON.
///
/// # Safety
/// - `response` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `nexus_free_string`.
/// - Returns NULL on error; call `nexus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nexus_decode_generated(response: *const c_char) -> *mut c_char {
    clear_last_error();

    let response_str = match cstr_to_string(response) {
        Some(s) => s,
        None => {
            set_last_error("Invalid response string pointer");
            return ptr::null_mut();
        }
    };

    finish(
        decode_generated(&response_str, Utc::now())
            .map_err(EngineError::from)
            .and_then(|items| Ok(serde_json::to_string(&items)?)),
    )
}

// ============================================================================
// Stateful Session API
// ============================================================================

/// Opaque handle to a live session controller
pub struct NexusSessionHandle {
    session: SessionController,
}

/// Create a session controller over an in-memory profile.
///
/// # Safety
/// - `profile_json` and `config_json` may be NULL, otherwise valid C strings.
/// - Returns a pointer that must be freed with `nexus_session_free`.
/// - Returns NULL on error; call `nexus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nexus_session_new(
    profile_json: *const c_char,
    config_json: *const c_char,
) -> *mut NexusSessionHandle {
    clear_last_error();

    let config = match config_from_ptr(config_json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let storage = match cstr_to_string(profile_json) {
        Some(json) => MemoryStorage::with_record(config.profile_key.clone(), json),
        None => MemoryStorage::new(),
    };
    let store = ProfileStore::load(Box::new(storage), Box::new(SystemClock), &config);
    let handle = Box::new(NexusSessionHandle {
        session: SessionController::new(store, config),
    });
    Box::into_raw(handle)
}

/// Free a session handle.
///
/// # Safety
/// - `session` must be a valid pointer returned by `nexus_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn nexus_session_free(session: *mut NexusSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Apply one raw UI signal and return the events it recorded as a JSON array.
///
/// # Safety
/// - `session` must be a valid pointer returned by `nexus_session_new`.
/// - `signal_json` must be a valid null-terminated C string holding one signal.
/// - Returns a newly allocated string that must be freed with `nexus_free_string`.
/// - Returns NULL on error; call `nexus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nexus_session_apply(
    session: *mut NexusSessionHandle,
    signal_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;

    let json_str = match cstr_to_string(signal_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid signal string pointer");
            return ptr::null_mut();
        }
    };

    let result = serde_json::from_str::<UiSignal>(&json_str)
        .map_err(EngineError::from)
        .and_then(|signal| {
            signal.validate()?;
            let (recorded, _) = apply_signal(&mut handle.session, &signal);
            Ok(serde_json::to_string(&recorded)?)
        });
    finish(result)
}

/// Return the session's current profile as JSON.
///
/// Any open detail view stays open.
///
/// # Safety
/// - `session` must be a valid pointer returned by `nexus_session_new`.
/// - Returns a newly allocated string that must be freed with `nexus_free_string`.
/// - Returns NULL on error; call `nexus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nexus_session_profile(session: *mut NexusSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &*session;
    finish(serde_json::to_string(handle.session.store().profile()).map_err(EngineError::from))
}

/// Close the open detail view, if any, and return its summary as JSON
/// (`null` when nothing was open).
///
/// # Safety
/// - `session` must be a valid pointer returned by `nexus_session_new`.
/// - Returns a newly allocated string that must be freed with `nexus_free_string`.
/// - Returns NULL on error; call `nexus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nexus_session_close(session: *mut NexusSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;
    let summary = handle.session.close(CloseReason::CloseButton);
    finish(serde_json::to_string(&summary).map_err(EngineError::from))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Nexus functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Nexus function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn nexus_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Nexus function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn nexus_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn nexus_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
