// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lock helpers that recover from poisoning.
//!
//! A panic on one thread while it holds a queue lock must not take the rest of
//! the pipeline down with it: the guarded data is a plain buffer that stays
//! structurally valid, so the poisoned guard is taken over as-is.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Locks a mutex, taking over the guard if the lock was poisoned.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(recover)
}

/// Acquires a read guard, taking over the guard if the lock was poisoned.
pub fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(recover)
}

/// Acquires a write guard, taking over the guard if the lock was poisoned.
pub fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(recover)
}

fn recover<G>(poisoned: PoisonError<G>) -> G {
    log::warn!("Recovered a lock poisoned by a panicking thread");
    poisoned.into_inner()
}
