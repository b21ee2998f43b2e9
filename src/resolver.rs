//! Symbolic name resolution.
//!
//! The protocol core consumes exactly two operations from its MIB
//! collaborator: symbolic name + indices to numeric OID, and numeric OID
//! back to a symbolic name. [`MibRegistry`] is the in-process
//! implementation: a read-mostly, monotonically add-only symbol table shared
//! by reference across sessions. MIB compilation is out of scope; symbols
//! are registered programmatically.
//!
//! Symbolic form: `MODULE::object[.index...]`, e.g.
//! `ALBEDO-CONFIG-MIB::configFilesOpsStatus.1`. Plain dotted numeric strings
//! pass through both directions unchanged.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::oid::Oid;

/// Name ⇄ OID translation consumed by sessions.
pub trait OidResolver: Send + Sync {
    /// Resolve `MODULE::object[.index...]` (or a dotted numeric string) to a
    /// numeric OID. Fails with [`Error::SymbolNotFound`] when the symbol or
    /// its module is not registered.
    fn resolve(&self, name: &str) -> Result<Oid>;

    /// Resolve a numeric OID back to `MODULE::object[.index...]`. Falls back
    /// to the dotted numeric string when no registered symbol is a prefix.
    fn reverse_resolve(&self, oid: &Oid) -> String;

    /// True when vendor (ALBEDO) modules are registered. When false, only
    /// standard symbols resolve and callers relying on vendor tables should
    /// use numeric OIDs.
    fn has_albedo_modules(&self) -> bool;
}

struct RegistryInner {
    /// `MODULE::object` -> base OID.
    forward: BTreeMap<String, Oid>,
    /// Base OID -> `MODULE::object`, for longest-prefix reverse lookup.
    reverse: BTreeMap<Oid, String>,
    has_albedo: bool,
}

/// Shared, add-only symbol registry.
///
/// Registration is idempotent and first-registration-wins: re-registering a
/// symbol never rebinds it, so resolution results cached by callers stay
/// valid for the life of the process. Registering a module is independent of
/// whether its backing data exists yet; an empty module is a valid
/// registration.
pub struct MibRegistry {
    inner: RwLock<RegistryInner>,
}

impl MibRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                forward: BTreeMap::new(),
                reverse: BTreeMap::new(),
                has_albedo: false,
            }),
        }
    }

    /// A registry pre-populated with the ALBEDO objects the crate's own
    /// layers use (multifunction selector, configuration-file operations).
    pub fn with_albedo_defaults() -> Arc<Self> {
        let registry = Self::new();
        let base = Oid::from_slice(&[1, 3, 6, 1, 4, 1, 39412, 1]);

        let mf = "ALBEDO-MULTIFUNCTION-MIB";
        registry.register(mf, "mfActiveFunc", base.extended(&[30, 1]));
        registry.register(mf, "mfFuncIndex", base.extended(&[30, 2, 1, 1]));
        registry.register(mf, "mfFuncType", base.extended(&[30, 2, 1, 2]));
        registry.register(mf, "mfFuncMode", base.extended(&[30, 2, 1, 3]));

        let cfg = "ALBEDO-CONFIG-MIB";
        registry.register(cfg, "configFilesOpsIndex", base.extended(&[12, 1, 1]));
        registry.register(cfg, "configFilesOpsFileName", base.extended(&[12, 1, 2]));
        registry.register(cfg, "configFilesOpsDevice", base.extended(&[12, 1, 3]));
        registry.register(cfg, "configFilesOpsAction", base.extended(&[12, 1, 4]));
        registry.register(cfg, "configFilesOpsResult", base.extended(&[12, 1, 5]));
        registry.register(cfg, "configFilesOpsStatus", base.extended(&[12, 1, 6]));

        Arc::new(registry)
    }

    /// Register one symbol. Idempotent; a second registration of the same
    /// symbol is ignored (add-only, never rebound).
    pub fn register(&self, module: &str, object: &str, oid: Oid) {
        let key = format!("{module}::{object}");
        let mut inner = self.inner.write().unwrap();
        if inner.forward.contains_key(&key) {
            tracing::debug!(symbol = %key, "symbol already registered, keeping first binding");
            return;
        }
        if module.starts_with("ALBEDO") {
            inner.has_albedo = true;
        }
        inner.reverse.entry(oid.clone()).or_insert_with(|| key.clone());
        inner.forward.insert(key, oid);
    }

    /// Register a batch of objects under one module.
    pub fn register_module<'a, I>(&self, module: &str, objects: I)
    where
        I: IntoIterator<Item = (&'a str, Oid)>,
    {
        for (object, oid) in objects {
            self.register(module, object, oid);
        }
    }
}

impl Default for MibRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OidResolver for MibRegistry {
    fn resolve(&self, name: &str) -> Result<Oid> {
        // Dotted numeric strings pass straight through
        if name
            .strip_prefix('.')
            .unwrap_or(name)
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.')
            && !name.is_empty()
        {
            return Oid::parse(name);
        }

        let (module, rest) = name.split_once("::").ok_or_else(|| Error::SymbolNotFound {
            name: name.to_string(),
        })?;
        let (object, indices) = match rest.split_once('.') {
            Some((object, tail)) => {
                let mut indices = Vec::new();
                for part in tail.split('.') {
                    let arc: u32 = part.parse().map_err(|_| Error::SymbolNotFound {
                        name: name.to_string(),
                    })?;
                    indices.push(arc);
                }
                (object, indices)
            }
            None => (rest, Vec::new()),
        };

        let key = format!("{module}::{object}");
        let inner = self.inner.read().unwrap();
        let base = inner.forward.get(&key).ok_or_else(|| Error::SymbolNotFound {
            name: name.to_string(),
        })?;
        Ok(base.extended(&indices))
    }

    fn reverse_resolve(&self, oid: &Oid) -> String {
        let inner = self.inner.read().unwrap();
        // Longest registered prefix: scan down from the closest key <= oid.
        for (base, name) in inner.reverse.range(..=oid.clone()).rev() {
            if let Some(suffix) = oid.suffix_of(base) {
                if suffix.is_empty() {
                    return name.clone();
                }
                let tail: Vec<String> = suffix.iter().map(|arc| arc.to_string()).collect();
                return format!("{name}.{}", tail.join("."));
            }
        }
        oid.to_string()
    }

    fn has_albedo_modules(&self) -> bool {
        self.inner.read().unwrap().has_albedo
    }
}
