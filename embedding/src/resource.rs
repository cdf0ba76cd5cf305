// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Process-wide custody of the heavyweight objects the matching engine needs but does not own:
//! the embedding model, its tokenizer, and a stopword list. The actual model inference is an
//! external collaborator; this module only manages the lifecycle of whatever stands in for it.

use std::sync::{Arc, Mutex};

use displaydoc::Display;
use thiserror::Error;

/// A heavyweight object owned by the [`ResourceManager`].
///
/// Implementors decide what "loading" means (reading a model file, building a tokenizer, ...).
pub trait Resource: Sized {
    type Config;

    /// Loads the resource from its configuration.
    ///
    /// # Errors
    /// Fails if the resource can't be brought up, e.g. a missing model file.
    fn load(config: &Self::Config) -> Result<Self, ResourceError>;

    /// Releases the resource. The default does nothing; override for explicit teardown.
    fn unload(self) {}
}

/// Errors of the [`ResourceManager`].
#[derive(Debug, Display, Error)]
pub enum ResourceError {
    /// Resource {0} is not loaded
    Unavailable(&'static str),
}

struct Loaded<R> {
    resource: R,
    ref_count: usize,
}

/// Process-wide singleton custody of a single resource kind.
///
/// `open` is idempotent: repeated calls while the resource is already loaded just bump a
/// reference count, so nested scopes compose. `close` decrements the count and unloads once it
/// reaches zero. Concurrent `get` is safe (it only reads); concurrent `open`/`close` is the
/// caller's responsibility to serialize, as documented on the type.
pub struct ResourceManager<R>
where
    R: Resource,
{
    name: &'static str,
    state: Mutex<Option<Loaded<R>>>,
}

impl<R> ResourceManager<R>
where
    R: Resource,
    R: Clone,
{
    /// Creates an empty, closed manager for a named resource kind.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(None),
        }
    }

    /// Idempotently acquires the resource, loading it on first use.
    ///
    /// # Errors
    /// Propagates [`Resource::load`] failures.
    pub fn open(&self, config: &R::Config) -> Result<(), ResourceError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(loaded) = &mut *state {
            loaded.ref_count += 1;
        } else {
            let resource = R::load(config)?;
            *state = Some(Loaded {
                resource,
                ref_count: 1,
            });
        }
        Ok(())
    }

    /// Releases one acquisition, unloading the resource once the last scope closes.
    pub fn close(&self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let unload = if let Some(loaded) = &mut *state {
            loaded.ref_count -= 1;
            loaded.ref_count == 0
        } else {
            false
        };
        if unload {
            if let Some(loaded) = state.take() {
                loaded.resource.unload();
            }
        }
    }

    /// Gets a clone of the resource.
    ///
    /// # Errors
    /// Fails if the resource hasn't been [`open`](Self::open)ed.
    pub fn get(&self) -> Result<R, ResourceError> {
        let state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state
            .as_ref()
            .map(|loaded| loaded.resource.clone())
            .ok_or(ResourceError::Unavailable(self.name))
    }
}

/// A scoped acquisition of a resource that releases it on drop, including on unwind.
#[must_use]
pub struct ResourceHandle<'a, R>
where
    R: Resource + Clone,
{
    manager: &'a ResourceManager<R>,
}

impl<'a, R> ResourceHandle<'a, R>
where
    R: Resource + Clone,
{
    /// Acquires a scoped handle on the manager's resource.
    ///
    /// # Errors
    /// Propagates [`ResourceManager::open`] failures.
    pub fn acquire(
        manager: &'a ResourceManager<R>,
        config: &R::Config,
    ) -> Result<Self, ResourceError> {
        manager.open(config)?;
        Ok(Self { manager })
    }

    /// Gets a clone of the resource.
    ///
    /// # Errors
    /// Fails if the resource was released concurrently, which should not happen within a scope.
    pub fn get(&self) -> Result<R, ResourceError> {
        self.manager.get()
    }
}

impl<R> Drop for ResourceHandle<'_, R>
where
    R: Resource + Clone,
{
    fn drop(&mut self) {
        self.manager.close();
    }
}

/// A stopword set shared across attribute matching.
#[derive(Clone, Default)]
pub struct StopWords(Arc<Vec<String>>);

impl StopWords {
    pub fn new(words: Vec<String>) -> Self {
        Self(Arc::new(words))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.iter().any(|stopword| stopword == word)
    }
}

impl Resource for StopWords {
    type Config = Vec<String>;

    fn load(config: &Self::Config) -> Result<Self, ResourceError> {
        Ok(Self::new(config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_idempotent_and_get() {
        let manager = ResourceManager::<StopWords>::new("stopwords");
        manager.open(&vec!["the".into()]).unwrap();
        manager.open(&vec!["the".into()]).unwrap();
        assert!(manager.get().unwrap().contains("the"));
        manager.close();
        assert!(manager.get().is_ok());
        manager.close();
        assert!(matches!(manager.get(), Err(ResourceError::Unavailable(_))));
    }

    #[test]
    fn test_get_before_open_fails() {
        let manager = ResourceManager::<StopWords>::new("stopwords");
        assert!(matches!(manager.get(), Err(ResourceError::Unavailable(_))));
    }

    #[test]
    fn test_scoped_handle_releases_on_drop() {
        let manager = ResourceManager::<StopWords>::new("stopwords");
        {
            let handle = ResourceHandle::acquire(&manager, &vec!["a".into()]).unwrap();
            assert!(handle.get().unwrap().contains("a"));
        }
        assert!(matches!(manager.get(), Err(ResourceError::Unavailable(_))));
    }

    #[test]
    fn test_nested_scopes_compose() {
        let manager = ResourceManager::<StopWords>::new("stopwords");
        let outer = ResourceHandle::acquire(&manager, &vec!["a".into()]).unwrap();
        {
            let _inner = ResourceHandle::acquire(&manager, &vec!["a".into()]).unwrap();
            assert!(manager.get().is_ok());
        }
        assert!(manager.get().is_ok());
        drop(outer);
        assert!(manager.get().is_err());
    }
}
