/*
 *  Copyright 2025-2026 Activity Service Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Data access layer with runtime backend selection.
//!
//! Every operation dispatches to a backend-specific implementation based on
//! the connection type detected at startup, and runs its blocking diesel work
//! on the pool via `interact`.

use crate::database::{BackendType, Database};

pub mod models;
pub mod outbox_event;

pub use outbox_event::OutboxEventDAL;

/// Helper macro for dispatching an operation to the backend-specific
/// implementation.
#[macro_export]
macro_rules! dispatch_backend {
    ($backend:expr, $pg:expr, $sqlite:expr) => {{
        #[allow(unreachable_patterns)]
        match $backend {
            #[cfg(feature = "postgres")]
            $crate::database::BackendType::Postgres => $pg,
            #[cfg(feature = "sqlite")]
            $crate::database::BackendType::Sqlite => $sqlite,
            other => panic!("backend {:?} not enabled at compile time", other),
        }
    }};
}

/// The data access layer root.
///
/// `DAL` is `Clone`; each clone references the same underlying connection
/// pool.
#[derive(Clone, Debug)]
pub struct DAL {
    /// The database instance with connection pool
    pub database: Database,
}

impl DAL {
    /// Creates a new DAL over the given database.
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    /// Returns the backend type for this DAL instance.
    pub fn backend(&self) -> BackendType {
        self.database.backend()
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Returns the outbox event DAL.
    pub fn outbox_event(&self) -> OutboxEventDAL {
        OutboxEventDAL::new(self)
    }
}
