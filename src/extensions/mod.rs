//! Optional add-on behaviour hooked into the horn's lifecycle.
//!
//! Extensions are trait objects in a fixed-capacity registry.  Each one
//! sees the same small set of lifecycle hooks and may contribute entries
//! to the mode-button menu:
//!
//! ```text
//!   registry ── on_start / on_wake / on_sleep ──────────▶ every extension
//!            ── on_tune_start / on_tune_stop ───────────▶ every extension
//!            ── run_menu_item(global index) ─▶ (extension, local index)
//! ```
//!
//! Menu entries are numbered in registration order: an extension with two
//! items registered after one with three owns global indices 3 and 4.

pub mod burglar_alarm;
pub mod sos;

use core::fmt;

use heapless::Vec;
use log::{info, warn};

/// Lifecycle hooks and menu actions.  Every hook defaults to a no-op.
///
/// `H` is the hardware handle the horn hands to its extensions.
pub trait Extension<H> {
    fn name(&self) -> &'static str;

    /// Once, after boot.
    fn on_start(&mut self, _hw: &mut H) {}

    /// The horn woke from idle sleep.
    fn on_wake(&mut self, _hw: &mut H) {}

    /// The horn is about to idle-sleep.
    fn on_sleep(&mut self, _hw: &mut H) {}

    /// Just before the horn starts sounding.
    fn on_tune_start(&mut self, _hw: &mut H) {}

    /// After the horn button is released.
    fn on_tune_stop(&mut self, _hw: &mut H) {}

    /// Labels of this extension's menu entries.
    fn menu_items(&self) -> &'static [&'static str] {
        &[]
    }

    /// Run entry `index` of [`menu_items`](Self::menu_items).  May block
    /// for as long as the action takes.
    fn run_menu_item(&mut self, _index: usize, _hw: &mut H) {}
}

/// Errors from [`ExtensionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionError {
    /// The registry already holds its compile-time capacity.
    RegistryFull { capacity: usize },
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistryFull { capacity } => {
                write!(f, "extension registry full ({} slots)", capacity)
            }
        }
    }
}

/// Where a global menu index lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
    pub extension: usize,
    pub local: usize,
    pub label: &'static str,
}

/// Up to `N` borrowed extensions.
pub struct ExtensionRegistry<'a, H, const N: usize> {
    extensions: Vec<&'a mut dyn Extension<H>, N>,
}

impl<H, const N: usize> Default for ExtensionRegistry<'_, H, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, H, const N: usize> ExtensionRegistry<'a, H, N> {
    pub const fn new() -> Self {
        Self {
            extensions: Vec::new(),
        }
    }

    pub fn register(&mut self, extension: &'a mut dyn Extension<H>) -> Result<(), ExtensionError> {
        let name = extension.name();
        self.extensions
            .push(extension)
            .map_err(|_| ExtensionError::RegistryFull { capacity: N })?;
        info!("extension registered: {}", name);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.extensions.iter().map(|e| e.name())
    }

    // ── Hooks ─────────────────────────────────────────────────

    pub fn call_on_start(&mut self, hw: &mut H) {
        info!("There are {} extensions installed", self.extensions.len());
        for ext in self.extensions.iter_mut() {
            ext.on_start(hw);
        }
    }

    pub fn call_on_wake(&mut self, hw: &mut H) {
        for ext in self.extensions.iter_mut() {
            ext.on_wake(hw);
        }
    }

    pub fn call_on_sleep(&mut self, hw: &mut H) {
        for ext in self.extensions.iter_mut() {
            ext.on_sleep(hw);
        }
    }

    pub fn call_on_tune_start(&mut self, hw: &mut H) {
        for ext in self.extensions.iter_mut() {
            ext.on_tune_start(hw);
        }
    }

    pub fn call_on_tune_stop(&mut self, hw: &mut H) {
        for ext in self.extensions.iter_mut() {
            ext.on_tune_stop(hw);
        }
    }

    // ── Menu ──────────────────────────────────────────────────

    /// Total menu entries across all extensions.
    pub fn menu_len(&self) -> usize {
        self.extensions.iter().map(|e| e.menu_items().len()).sum()
    }

    /// Resolve a global menu index.
    pub fn menu_entry(&self, index: usize) -> Option<MenuEntry> {
        let mut base = 0;
        for (i, ext) in self.extensions.iter().enumerate() {
            let items = ext.menu_items();
            if index < base + items.len() {
                let local = index - base;
                return Some(MenuEntry {
                    extension: i,
                    local,
                    label: items[local],
                });
            }
            base += items.len();
        }
        None
    }

    /// Run global menu entry `index`.  Returns `false` if there is none.
    pub fn run_menu_item(&mut self, index: usize, hw: &mut H) -> bool {
        let Some(entry) = self.menu_entry(index) else {
            warn!("menu item {} does not exist ({} available)", index, self.menu_len());
            return false;
        };
        info!("menu: running '{}'", entry.label);
        self.extensions[entry.extension].run_menu_item(entry.local, hw);
        true
    }
}
