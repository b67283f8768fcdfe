// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Ordered collections of descriptors, addressable by position or name.

use crate::TensorDescriptor;

/// The descriptors produced or consumed by one operator invocation.
#[derive(Debug, Default)]
pub struct TensorList<'a> {
    tensors: Vec<TensorDescriptor<'a>>,
}

impl<'a> TensorList<'a> {
    pub fn new() -> Self {
        Self {
            tensors: Vec::new(),
        }
    }

    pub fn push(&mut self, tensor: TensorDescriptor<'a>) {
        self.tensors.push(tensor);
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TensorDescriptor<'a>> {
        self.tensors.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TensorDescriptor<'a>> {
        self.tensors.get_mut(index)
    }

    /// First descriptor carrying `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&TensorDescriptor<'a>> {
        self.tensors.iter().find(|t| t.name() == Some(name))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TensorDescriptor<'a>> {
        self.tensors.iter()
    }

    pub fn into_vec(self) -> Vec<TensorDescriptor<'a>> {
        self.tensors
    }
}

impl<'a> FromIterator<TensorDescriptor<'a>> for TensorList<'a> {
    fn from_iter<I: IntoIterator<Item = TensorDescriptor<'a>>>(iter: I) -> Self {
        Self {
            tensors: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for TensorList<'a> {
    type Item = TensorDescriptor<'a>;
    type IntoIter = std::vec::IntoIter<TensorDescriptor<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tensors.into_iter()
    }
}
