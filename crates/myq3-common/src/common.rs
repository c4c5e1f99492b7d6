// Copyright (C) 1997-2001 Id Software, Inc.
// GPL-2.0-or-later
//
// common.rs — console printing and engine error reporting

use parking_lot::Mutex;

use crate::q_shared::{ERR_DROP, ERR_FATAL};

pub const MAXPRINTMSG: usize = 4096;

// ============================================================
// Redirect buffer for com_printf
// ============================================================

static RD_BUFFER: Mutex<Option<String>> = Mutex::new(None);

/// Begin redirecting printf output into a buffer.
pub fn com_begin_redirect() {
    *RD_BUFFER.lock() = Some(String::new());
}

/// End redirect and return the captured output.
pub fn com_end_redirect() -> Option<String> {
    RD_BUFFER.lock().take()
}

// ============================================================
// com_printf / com_dprintf / com_error
// ============================================================

/// General-purpose print. Goes to the redirect buffer when one is active,
/// stdout otherwise. Messages longer than MAXPRINTMSG are truncated.
pub fn com_printf(msg: &str) {
    let msg = truncate_message(msg);
    {
        let mut buf = RD_BUFFER.lock();
        if let Some(ref mut s) = *buf {
            s.push_str(msg);
            return;
        }
    }
    print!("{}", msg);
}

/// Developer-only print, gated on the "developer" cvar.
pub fn com_dprintf(msg: &str) {
    if crate::cvar::cvar_variable_value("developer") == 0.0 {
        return;
    }
    com_printf(msg);
}

/// Engine error handler.
/// - `ERR_FATAL`: prints to stderr and panics.
/// - `ERR_DROP`: prints a framed error and returns so the caller can recover.
/// - anything else is printed as a plain message.
pub fn com_error(code: i32, msg: &str) {
    match code {
        ERR_FATAL => {
            eprintln!("Error: {}", msg);
            panic!("Fatal error: {}", msg);
        }
        ERR_DROP => {
            com_printf(&format!("********************\nERROR: {}\n********************\n", msg));
        }
        _ => com_printf(msg),
    }
}

fn truncate_message(msg: &str) -> &str {
    if msg.len() < MAXPRINTMSG {
        return msg;
    }
    let mut end = MAXPRINTMSG - 1;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    &msg[..end]
}

// ============================================================
// Tests
// ============================================================
