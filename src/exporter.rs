//! Prometheus collector for management-interface counters.

use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily};
use prometheus::{GaugeVec, Opts};

use crate::catalog::{CounterRegistry, NAMESPACE};
use crate::client::{CounterClient, ManagementClient};
use crate::config::{ExporterConfig, Labels};
use crate::error::ExporterError;

/// Collector translating raw cache-server counters into Prometheus metrics.
///
/// The descriptor registry and the configured labels are fixed at
/// construction, so every metric a collection cycle can ever emit was
/// advertised by `desc()` first. The `up` gauge is the only mutable state
/// and is set exactly once per cycle, independent of counter emission.
pub struct Exporter {
    client: Box<dyn CounterClient>,
    hostname: String,
    labels: Labels,
    registry: CounterRegistry,
    up: GaugeVec,
}

impl Exporter {
    /// Create an exporter backed by the HTTP management client
    pub fn new(config: &ExporterConfig) -> Result<Self, ExporterError> {
        let client = ManagementClient::new(config)?;
        Self::with_client(config, Box::new(client))
    }

    /// Create an exporter with an explicit fetch collaborator
    pub fn with_client(
        config: &ExporterConfig,
        client: Box<dyn CounterClient>,
    ) -> Result<Self, ExporterError> {
        config.validate()?;
        let registry = CounterRegistry::build(&config.labels.keys)?;
        let up = GaugeVec::new(
            Opts::new("up", "Was the last fetch of cache-server counters successful.")
                .namespace(NAMESPACE),
            &["host"],
        )?;

        Ok(Self {
            client,
            hostname: config.hostname.clone(),
            labels: config.labels.clone(),
            registry,
            up,
        })
    }

    /// Number of counters this exporter can emit
    pub fn counter_count(&self) -> usize {
        self.registry.len()
    }

    /// Build the constant counter family for one recognized sample
    fn counter_family(&self, desc: &Desc, value: f64) -> MetricFamily {
        let mut counter = proto::Counter::default();
        counter.set_value(value);

        let mut metric = proto::Metric::default();
        for (name, value) in desc.variable_labels.iter().zip(self.labels.values.iter()) {
            let mut pair = proto::LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            metric.mut_label().push(pair);
        }
        metric.set_counter(counter);

        let mut family = MetricFamily::default();
        family.set_name(desc.fq_name.clone());
        family.set_help(desc.help.clone());
        family.set_field_type(proto::MetricType::COUNTER);
        family.mut_metric().push(metric);
        family
    }
}

impl Collector for Exporter {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.up.desc();
        descs.extend(self.registry.descs());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = Vec::new();

        match self.client.get_counters() {
            Ok(samples) => {
                self.up.with_label_values(&[self.hostname.as_str()]).set(1.0);

                let mut dropped = 0usize;
                for sample in &samples {
                    match self.registry.get(&sample.key) {
                        Some(desc) => families.push(self.counter_family(desc, sample.value)),
                        None => dropped += 1,
                    }
                }
                if dropped > 0 {
                    tracing::debug!(dropped, "ignored counters with no registered descriptor");
                }
            }
            Err(e) => {
                self.up.with_label_values(&[self.hostname.as_str()]).set(0.0);
                tracing::warn!(
                    host = %self.hostname,
                    error = %e,
                    "could not fetch counters from cache server"
                );
            }
        }

        families.extend(self.up.collect());
        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CounterSample;

    struct StaticClient {
        samples: Vec<CounterSample>,
    }

    impl CounterClient for StaticClient {
        fn get_counters(&self) -> Result<Vec<CounterSample>, ExporterError> {
            Ok(self.samples.clone())
        }
    }

    struct FailingClient;

    impl CounterClient for FailingClient {
        fn get_counters(&self) -> Result<Vec<CounterSample>, ExporterError> {
            Err(ExporterError::FetchError("connection refused".into()))
        }
    }

    fn sample(key: &str, value: f64) -> CounterSample {
        CounterSample {
            key: key.to_string(),
            value,
        }
    }

    fn test_config() -> ExporterConfig {
        ExporterConfig {
            hostname: "cache01".to_string(),
            labels: Labels::new(vec!["region".to_string()], vec!["us-east".to_string()]).unwrap(),
            ..Default::default()
        }
    }

    fn counter_families(families: &[MetricFamily]) -> Vec<&MetricFamily> {
        families
            .iter()
            .filter(|f| f.get_field_type() == proto::MetricType::COUNTER)
            .collect()
    }

    fn up_value(families: &[MetricFamily]) -> f64 {
        let up = families
            .iter()
            .find(|f| f.get_name() == "cachemgr_up")
            .expect("up family missing");
        assert_eq!(up.get_metric().len(), 1);
        up.get_metric()[0].get_gauge().get_value()
    }

    #[test]
    fn test_collect_emits_recognized_counters() {
        let client = StaticClient {
            samples: vec![
                sample("client_http.requests", 42.0),
                sample("client_http.hits", 17.0),
                sample("unknown.stat", 9.0),
            ],
        };
        let exporter = Exporter::with_client(&test_config(), Box::new(client)).unwrap();

        let families = exporter.collect();
        let counters = counter_families(&families);
        assert_eq!(counters.len(), 2);
        assert_eq!(up_value(&families), 1.0);

        let requests = counters
            .iter()
            .find(|f| f.get_name() == "cachemgr_client_http_requests_total")
            .expect("requests family missing");
        assert_eq!(requests.get_metric()[0].get_counter().get_value(), 42.0);

        let hits = counters
            .iter()
            .find(|f| f.get_name() == "cachemgr_client_http_hits_total")
            .expect("hits family missing");
        assert_eq!(hits.get_metric()[0].get_counter().get_value(), 17.0);

        // The unknown key left no trace.
        assert!(!families.iter().any(|f| f.get_name().contains("unknown")));
    }

    #[test]
    fn test_collect_failure_degrades_to_up_zero() {
        let exporter = Exporter::with_client(&test_config(), Box::new(FailingClient)).unwrap();

        let families = exporter.collect();
        assert!(counter_families(&families).is_empty());
        assert_eq!(up_value(&families), 0.0);
    }

    #[test]
    fn test_liveness_recovers_after_success() {
        let config = test_config();
        let failing = Exporter::with_client(&config, Box::new(FailingClient)).unwrap();
        let families = failing.collect();
        assert_eq!(up_value(&families), 0.0);

        let ok = Exporter::with_client(
            &config,
            Box::new(StaticClient {
                samples: vec![sample("swap.outs", 3.0)],
            }),
        )
        .unwrap();
        let families = ok.collect();
        assert_eq!(up_value(&families), 1.0);
        assert_eq!(counter_families(&families).len(), 1);
    }

    #[test]
    fn test_desc_idempotent() {
        let exporter =
            Exporter::with_client(&test_config(), Box::new(FailingClient)).unwrap();

        let mut first: Vec<String> = exporter.desc().iter().map(|d| d.fq_name.clone()).collect();
        let mut second: Vec<String> = exporter.desc().iter().map(|d| d.fq_name.clone()).collect();
        first.sort();
        second.sort();

        assert_eq!(first, second);
        assert_eq!(first.len(), exporter.counter_count() + 1);
    }

    #[test]
    fn test_collect_is_subset_of_desc() {
        let client = StaticClient {
            samples: vec![
                sample("client_http.requests", 1.0),
                sample("server.all.errors", 2.0),
                sample("aborted_requests", 3.0),
            ],
        };
        let exporter = Exporter::with_client(&test_config(), Box::new(client)).unwrap();

        let declared: std::collections::HashSet<String> =
            exporter.desc().iter().map(|d| d.fq_name.clone()).collect();
        for family in exporter.collect() {
            assert!(
                declared.contains(family.get_name()),
                "undeclared family {}",
                family.get_name()
            );
        }
    }

    #[test]
    fn test_label_propagation_order() {
        let config = ExporterConfig {
            hostname: "cache01".to_string(),
            labels: Labels::new(
                vec!["region".to_string(), "tier".to_string()],
                vec!["us-east".to_string(), "edge".to_string()],
            )
            .unwrap(),
            ..Default::default()
        };
        let client = StaticClient {
            samples: vec![
                sample("client_http.requests", 1.0),
                sample("client_http.hits", 2.0),
            ],
        };
        let exporter = Exporter::with_client(&config, Box::new(client)).unwrap();

        let families = exporter.collect();
        for family in counter_families(&families) {
            let labels = family.get_metric()[0].get_label();
            assert_eq!(labels.len(), 2);
            assert_eq!(labels[0].get_name(), "region");
            assert_eq!(labels[0].get_value(), "us-east");
            assert_eq!(labels[1].get_name(), "tier");
            assert_eq!(labels[1].get_value(), "edge");
        }
    }

    #[test]
    fn test_up_emitted_exactly_once_per_cycle() {
        let exporter = Exporter::with_client(
            &test_config(),
            Box::new(StaticClient {
                samples: vec![sample("client_http.requests", 1.0)],
            }),
        )
        .unwrap();

        let families = exporter.collect();
        let up_families: Vec<_> = families
            .iter()
            .filter(|f| f.get_name() == "cachemgr_up")
            .collect();
        assert_eq!(up_families.len(), 1);
        assert_eq!(up_families[0].get_metric().len(), 1);

        let host = &up_families[0].get_metric()[0].get_label()[0];
        assert_eq!(host.get_name(), "host");
        assert_eq!(host.get_value(), "cache01");
    }

    #[test]
    fn test_registers_with_prometheus_registry() {
        let exporter =
            Exporter::with_client(&test_config(), Box::new(FailingClient)).unwrap();
        let registry = prometheus::Registry::new();
        registry.register(Box::new(exporter)).unwrap();

        let families = registry.gather();
        assert!(families.iter().any(|f| f.get_name() == "cachemgr_up"));
    }
}
