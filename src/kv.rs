use anyhow::Result;

/// String key-value capability backing locally persisted state.
pub(crate) trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[cfg(test)]
pub(crate) use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use anyhow::{Result, bail};

    use super::KeyValueStore;

    #[derive(Debug, Default)]
    pub(crate) struct MemoryStore {
        values: RefCell<HashMap<String, String>>,
        fail_writes: Cell<bool>,
        fail_reads: Cell<bool>,
    }

    impl MemoryStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_value(key: &str, value: &str) -> Self {
            let store = Self::default();
            store
                .values
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            store
        }

        pub(crate) fn fail_writes(&self, fail: bool) {
            self.fail_writes.set(fail);
        }

        pub(crate) fn fail_reads(&self, fail: bool) {
            self.fail_reads.set(fail);
        }

        pub(crate) fn raw(&self, key: &str) -> Option<String> {
            self.values.borrow().get(key).cloned()
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if self.fail_reads.get() {
                bail!("storage unavailable");
            }
            Ok(self.values.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes.get() {
                bail!("storage quota exceeded");
            }
            self.values
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<()> {
            if self.fail_writes.get() {
                bail!("storage unavailable");
            }
            self.values.borrow_mut().remove(key);
            Ok(())
        }
    }
}
