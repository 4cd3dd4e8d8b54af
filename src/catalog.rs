//! Well-known management-interface counters and their descriptors.

use std::collections::HashMap;

use prometheus::core::Desc;

use crate::error::ExporterError;

/// Namespace prefix for every exported metric name
pub const NAMESPACE: &str = "cachemgr";

/// One known counter of the management interface.
///
/// The raw key reported by the cache server is `section.counter`; the
/// exported metric name is built from namespace, section and suffix with
/// dots mapped to underscores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    pub section: &'static str,
    pub counter: &'static str,
    pub suffix: &'static str,
    pub help: &'static str,
}

impl CounterEntry {
    /// Raw key as reported by the management interface
    pub fn key(&self) -> String {
        if self.section.is_empty() {
            self.counter.to_string()
        } else {
            format!("{}.{}", self.section, self.counter)
        }
    }

    /// Fully qualified exported metric name
    pub fn metric_name(&self) -> String {
        let mut parts = vec![NAMESPACE];
        if !self.section.is_empty() {
            parts.push(self.section);
        }
        parts.push(self.counter);
        if !self.suffix.is_empty() {
            parts.push(self.suffix);
        }
        parts.join("_").replace('.', "_")
    }
}

/// Counters exported by default, matching the management interface's
/// `counters` report.
pub const COUNTERS: &[CounterEntry] = &[
    CounterEntry {
        section: "client_http",
        counter: "requests",
        suffix: "total",
        help: "The total number of client requests",
    },
    CounterEntry {
        section: "client_http",
        counter: "hits",
        suffix: "total",
        help: "The total number of client cache hits",
    },
    CounterEntry {
        section: "client_http",
        counter: "errors",
        suffix: "total",
        help: "The total number of client http errors",
    },
    CounterEntry {
        section: "client_http",
        counter: "kbytes_in",
        suffix: "total",
        help: "The total number of client kbytes received",
    },
    CounterEntry {
        section: "client_http",
        counter: "kbytes_out",
        suffix: "total",
        help: "The total number of client kbytes transferred",
    },
    CounterEntry {
        section: "client_http",
        counter: "hit_kbytes_out",
        suffix: "total",
        help: "The total number of client kbytes cache hit",
    },
    CounterEntry {
        section: "server.all",
        counter: "requests",
        suffix: "total",
        help: "The total number of server requests",
    },
    CounterEntry {
        section: "server.all",
        counter: "errors",
        suffix: "total",
        help: "The total number of server errors",
    },
    CounterEntry {
        section: "server.all",
        counter: "kbytes_in",
        suffix: "total",
        help: "The total number of server kbytes received",
    },
    CounterEntry {
        section: "server.all",
        counter: "kbytes_out",
        suffix: "total",
        help: "The total number of server kbytes transferred",
    },
    CounterEntry {
        section: "server.http",
        counter: "requests",
        suffix: "total",
        help: "The total number of server http requests",
    },
    CounterEntry {
        section: "server.http",
        counter: "errors",
        suffix: "total",
        help: "The total number of server http errors",
    },
    CounterEntry {
        section: "server.http",
        counter: "kbytes_in",
        suffix: "total",
        help: "The total number of server http kbytes received",
    },
    CounterEntry {
        section: "server.http",
        counter: "kbytes_out",
        suffix: "total",
        help: "The total number of server http kbytes transferred",
    },
    CounterEntry {
        section: "server.ftp",
        counter: "requests",
        suffix: "total",
        help: "The total number of server ftp requests",
    },
    CounterEntry {
        section: "server.ftp",
        counter: "errors",
        suffix: "total",
        help: "The total number of server ftp errors",
    },
    CounterEntry {
        section: "server.ftp",
        counter: "kbytes_in",
        suffix: "total",
        help: "The total number of server ftp kbytes received",
    },
    CounterEntry {
        section: "server.ftp",
        counter: "kbytes_out",
        suffix: "total",
        help: "The total number of server ftp kbytes transferred",
    },
    CounterEntry {
        section: "server.other",
        counter: "requests",
        suffix: "total",
        help: "The total number of server other requests",
    },
    CounterEntry {
        section: "server.other",
        counter: "errors",
        suffix: "total",
        help: "The total number of server other errors",
    },
    CounterEntry {
        section: "server.other",
        counter: "kbytes_in",
        suffix: "total",
        help: "The total number of server other kbytes received",
    },
    CounterEntry {
        section: "server.other",
        counter: "kbytes_out",
        suffix: "total",
        help: "The total number of server other kbytes transferred",
    },
    CounterEntry {
        section: "swap",
        counter: "ins",
        suffix: "total",
        help: "The total number of objects read from disk",
    },
    CounterEntry {
        section: "swap",
        counter: "outs",
        suffix: "total",
        help: "The total number of objects saved to disk",
    },
    CounterEntry {
        section: "swap",
        counter: "files_cleaned",
        suffix: "total",
        help: "The total number of orphaned cache files removed",
    },
    CounterEntry {
        section: "",
        counter: "aborted_requests",
        suffix: "total",
        help: "The total number of aborted requests",
    },
];

/// Immutable mapping from raw counter key to its exported descriptor.
///
/// Built once at startup and never mutated afterwards, which is what makes
/// concurrent collection cycles safe without locking and guarantees that
/// collection can never reference a descriptor that was not advertised.
pub struct CounterRegistry {
    descs: HashMap<String, Desc>,
}

impl CounterRegistry {
    /// Build the registry from the default catalog, appending `extra_labels`
    /// to every descriptor's label set
    pub fn build(extra_labels: &[String]) -> Result<Self, ExporterError> {
        Self::with_catalog(COUNTERS, extra_labels)
    }

    /// Build the registry from an explicit catalog
    pub fn with_catalog(
        catalog: &[CounterEntry],
        extra_labels: &[String],
    ) -> Result<Self, ExporterError> {
        let mut descs = HashMap::with_capacity(catalog.len());
        for entry in catalog {
            let desc = Desc::new(
                entry.metric_name(),
                entry.help.to_string(),
                extra_labels.to_vec(),
                HashMap::new(),
            )?;
            descs.insert(entry.key(), desc);
        }
        Ok(Self { descs })
    }

    /// Descriptor for a raw counter key, if the key is known
    pub fn get(&self, key: &str) -> Option<&Desc> {
        self.descs.get(key)
    }

    /// All descriptors, in no particular order
    pub fn descs(&self) -> impl Iterator<Item = &Desc> {
        self.descs.values()
    }

    pub fn len(&self) -> usize {
        self.descs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }
}
