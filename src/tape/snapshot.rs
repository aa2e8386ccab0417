use std::fs;
use std::path::Path;

use serde::{ Serialize, Deserialize, de::DeserializeOwned };

use crate::{
  tape::Phase,
  error::{ Result, TapeError },
};


/// State of a single node at the time of a [Snapshot].

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord<T> {
  pub position: usize,
  pub value: Option<T>,
  pub adjoint: Option<T>,
  pub operands: Vec<usize>,
}


/// Detached copy of a tape's values and adjoints.
///
/// Unlike [NodeId](crate::NodeId)s, snapshots survive recovery
/// and can be written to disc.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
  pub generation: u32,
  pub phase: Phase,
  pub nodes: Vec<NodeRecord<T>>,
}

impl<T> Snapshot<T> {
  /// Adjoints of all value-carrying nodes, in tape order.

  pub fn adjoints(&self) -> impl Iterator<Item = (usize, T)> + '_ where T: Copy {
    self.nodes.iter().filter_map(|node| node.adjoint.map(|adjoint| (node.position, adjoint) ))
  }
}

impl<T: Serialize + DeserializeOwned> Snapshot<T> {
  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    postcard::to_allocvec(self).map_err(|err| TapeError::Snapshot(err.to_string()) )
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    postcard::from_bytes(bytes).map_err(|err| TapeError::Snapshot(err.to_string()) )
  }

  pub fn save(&self, filename: impl AsRef<Path>) -> Result<()> {
    fs::write(filename, self.to_bytes()?)?;
    Ok(())
  }

  pub fn load(filename: impl AsRef<Path>) -> Result<Self> {
    let bytes = fs::read(filename)?;
    Self::from_bytes(&bytes)
  }
}
