// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Single-flight guard.
//!
//! Operations that must never overlap (key re-creation, a sync round for the
//! same account) take the guard with [`SingleFlight::try_acquire`]. A second
//! caller does not wait: it gets `None` and reports "already running".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Non-blocking mutual exclusion for one kind of operation.
///
/// Cheap to clone; clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    running: Arc<AtomicBool>,
}

/// Holds the guard until dropped.
#[derive(Debug)]
pub struct SingleFlightGuard {
    running: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the guard, or returns `None` if it is already held.
    pub fn try_acquire(&self) -> Option<SingleFlightGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SingleFlightGuard {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for SingleFlightGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let flight = SingleFlight::new();
        let guard = flight.try_acquire();
        assert!(guard.is_some());
        assert!(flight.is_running());
        assert!(flight.clone().try_acquire().is_none());

        drop(guard);
        assert!(!flight.is_running());
        assert!(flight.try_acquire().is_some());
    }

    #[test]
    fn test_exclusive_across_threads() {
        let flight = SingleFlight::new();
        let _guard = flight.try_acquire();

        let other = flight.clone();
        let acquired = std::thread::spawn(move || other.try_acquire().is_some())
            .join()
            .unwrap();
        assert!(!acquired);
    }
}
