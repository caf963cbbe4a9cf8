//! Content-selecting reads

use std::time::Instant;

use cfgtx_core::errors::{Result, TxError};
use cfgtx_core::log_op_start;
use cfgtx_core::model::{DataNode, DataPath, Datastore};
use cfgtx_core::ops::merge_config_and_state;
use serde::{Deserialize, Serialize};

use super::strategy::{log_outcome, DataStrategy};

/// Which datastores a read covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Content {
    /// Configuration only
    #[default]
    Config,
    /// Operational state only
    #[serde(rename = "nonconfig")]
    NonConfig,
    /// Both, merged
    All,
}

impl DataStrategy {
    /// Read `path` from the datastores selected by `content`
    ///
    /// `fields` restricts the result to the given subtrees (relative to
    /// `path`); only device backends support it.
    ///
    /// # Errors
    ///
    /// - `DataMissing` when no selected datastore holds data at `path`
    /// - `InconsistentMerge` when config and state cannot be combined
    /// - read failures from the backend
    pub async fn read_data(
        &self,
        content: Content,
        path: &DataPath,
        fields: Option<&[DataPath]>,
    ) -> Result<DataNode> {
        let start = Instant::now();
        log_op_start!("read_data", path = %path, content = ?content, backend = self.backend_name());
        let result = self.read_data_inner(content, path, fields).await;
        log_outcome("read_data", start, &result);
        result
    }

    async fn read_data_inner(
        &self,
        content: Content,
        path: &DataPath,
        fields: Option<&[DataPath]>,
    ) -> Result<DataNode> {
        let data = match content {
            Content::Config => self.read_store(Datastore::Configuration, path, fields).await?,
            Content::NonConfig => self.read_store(Datastore::Operational, path, fields).await?,
            Content::All => {
                let state = self.read_store(Datastore::Operational, path, fields).await?;
                let config = self.read_store(Datastore::Configuration, path, fields).await?;
                merge_config_and_state(state, config)?
            }
        };
        data.ok_or_else(|| {
            tracing::debug!(
                path = %path,
                "Request could not be completed because the relevant data model content does not exist"
            );
            TxError::data_missing(path)
        })
    }

    async fn read_store(
        &self,
        store: Datastore,
        path: &DataPath,
        fields: Option<&[DataPath]>,
    ) -> Result<Option<DataNode>> {
        match fields {
            Some(fields) => self.read_fields_inner(store, path, fields).await,
            None => self.read_inner(store, path).await,
        }
    }
}
