/*!
 * Admin Requests
 * Request envelope exchanged between the client and the call launcher
 */

use super::types::{ColumnFamilyModification, TableConfig, TableView};
use crate::core::bincode::{self as codec, CodecResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote method invoked by a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminMethod {
    CreateTable,
    GetTable,
    ListTables,
    ModifyColumnFamilies,
    DeleteTable,
}

impl AdminMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AdminMethod::CreateTable => "CreateTable",
            AdminMethod::GetTable => "GetTable",
            AdminMethod::ListTables => "ListTables",
            AdminMethod::ModifyColumnFamilies => "ModifyColumnFamilies",
            AdminMethod::DeleteTable => "DeleteTable",
        }
    }
}

impl fmt::Display for AdminMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Serialized request body, one variant per method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminRequest {
    CreateTable {
        parent: String,
        table_id: String,
        config: TableConfig,
    },
    GetTable {
        name: String,
        view: TableView,
    },
    ListTables {
        parent: String,
        view: TableView,
    },
    ModifyColumnFamilies {
        name: String,
        modifications: Vec<ColumnFamilyModification>,
    },
    DeleteTable {
        name: String,
    },
}

impl AdminRequest {
    pub fn method(&self) -> AdminMethod {
        match self {
            AdminRequest::CreateTable { .. } => AdminMethod::CreateTable,
            AdminRequest::GetTable { .. } => AdminMethod::GetTable,
            AdminRequest::ListTables { .. } => AdminMethod::ListTables,
            AdminRequest::ModifyColumnFamilies { .. } => AdminMethod::ModifyColumnFamilies,
            AdminRequest::DeleteTable { .. } => AdminMethod::DeleteTable,
        }
    }

    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        codec::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        codec::from_slice(bytes)
    }
}
