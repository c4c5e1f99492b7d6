// Copyright (C) 1997-2001 Id Software, Inc.
// GPL-2.0-or-later
//
// cvar.rs — console variables

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::common::com_printf;
use crate::q_shared::{CVAR_CHEAT, CVAR_INIT, CVAR_ROM};

/// A console variable.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub reset_string: String,
    pub flags: i32,
    pub modified: bool,
    pub value: f32,
    pub integer: i32,
}

impl Cvar {
    fn new(name: &str, value: &str, flags: i32) -> Self {
        let mut var = Self {
            name: name.to_string(),
            string: String::new(),
            reset_string: value.to_string(),
            flags,
            modified: true,
            value: 0.0,
            integer: 0,
        };
        var.assign(value);
        var
    }

    fn assign(&mut self, value: &str) {
        self.string = value.to_string();
        self.value = value.trim().parse::<f32>().unwrap_or(0.0);
        self.integer = self.value as i32;
        self.modified = true;
    }
}

/// The cvar table.
#[derive(Debug, Default)]
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
    /// Mirrors sv_cheats; CVAR_CHEAT variables refuse changes while false.
    pub cheats_allowed: bool,
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    pub fn find_var_mut(&mut self, name: &str) -> Option<&mut Cvar> {
        match self.cvar_index.get(name) {
            Some(&idx) => Some(&mut self.cvar_vars[idx]),
            None => None,
        }
    }

    /// Float value of a cvar, 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |v| v.value)
    }

    /// Integer value of a cvar, 0 if not found.
    pub fn variable_integer(&self, name: &str) -> i32 {
        self.find_var(name).map_or(0, |v| v.integer)
    }

    /// String value of a cvar, "" if not found.
    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |v| v.string.as_str())
    }

    /// Get or create a cvar. An existing cvar keeps its value; flags are OR'd in.
    pub fn get(&mut self, name: &str, value: &str, flags: i32) -> usize {
        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return idx;
        }

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar::new(name, value, flags));
        self.cvar_index.insert(name.to_string(), idx);
        idx
    }

    fn set2(&mut self, name: &str, value: &str, force: bool) -> usize {
        let cheats_allowed = self.cheats_allowed;
        let Some(&idx) = self.cvar_index.get(name) else {
            return self.get(name, value, 0);
        };
        let var = &mut self.cvar_vars[idx];

        if !force {
            if var.flags & (CVAR_ROM | CVAR_INIT) != 0 {
                com_printf(&format!("{} is write protected.\n", name));
                return idx;
            }
            if var.flags & CVAR_CHEAT != 0 && !cheats_allowed {
                com_printf(&format!("{} is cheat protected.\n", name));
                return idx;
            }
        }

        if var.string != value {
            var.assign(value);
        }
        idx
    }

    pub fn set(&mut self, name: &str, value: &str) -> usize {
        self.set2(name, value, false)
    }

    pub fn force_set(&mut self, name: &str, value: &str) -> usize {
        self.set2(name, value, true)
    }

    pub fn set_value(&mut self, name: &str, value: f32) {
        let text = if value == (value as i32) as f32 {
            format!("{}", value as i32)
        } else {
            format!("{}", value)
        };
        self.set(name, &text);
    }

    /// Put a cvar back to the value it was created with.
    pub fn reset(&mut self, name: &str) {
        if let Some(reset) = self.find_var(name).map(|v| v.reset_string.clone()) {
            self.set(name, &reset);
        }
    }

    /// Clear and return the modified flag.
    pub fn take_modified(&mut self, name: &str) -> bool {
        self.find_var_mut(name)
            .map_or(false, |v| std::mem::replace(&mut v.modified, false))
    }
}

// ============================================================
// Global table and free-function wrappers
// ============================================================

static CVAR_CTX: Mutex<Option<CvarContext>> = Mutex::new(None);

/// Create an empty global table, dropping any previous one.
pub fn cvar_init() {
    *CVAR_CTX.lock() = Some(CvarContext::new());
}

pub fn cvar_set(name: &str, value: &str) {
    if let Some(ref mut c) = *CVAR_CTX.lock() {
        c.set(name, value);
    }
}

pub fn cvar_variable_value(name: &str) -> f32 {
    CVAR_CTX.lock().as_ref().map_or(0.0, |c| c.variable_value(name))
}

/// Run a closure against the global table. Returns None if not initialized.
pub fn with_cvar_ctx<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut CvarContext) -> R,
{
    CVAR_CTX.lock().as_mut().map(f)
}

// ============================================================
// Tests
// ============================================================
