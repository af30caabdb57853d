//! Topic routing.
//!
//! The routing table maps configured topic filters to the domain that
//! handles them. It is built once from [`Settings`] and re-issued in full on
//! every (re)connect.

use sensorhub_core::{Domain, Settings, TopicFilter, TopicFilterError};
use tracing::{debug, info};

/// One configured filter and the domain that handles it.
#[derive(Debug, Clone)]
pub struct Route {
    pub domain: Domain,
    pub filter: TopicFilter,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// One route per configured topic of every enabled domain, in
    /// configuration order.
    pub fn from_settings(settings: &Settings) -> Result<Self, TopicFilterError> {
        let mut table = Self::new();
        for domain in Domain::ALL {
            if !settings.subscription_enabled(domain) {
                info!("Subscriptions for {} disabled by topic-overrides", domain);
                continue;
            }
            for topic in settings.topics(domain) {
                table.add(domain, TopicFilter::new(topic)?);
            }
        }
        Ok(table)
    }

    pub fn add(&mut self, domain: Domain, filter: TopicFilter) {
        debug!("Routing {} to {}", filter, domain);
        self.routes.push(Route { domain, filter });
    }

    /// Domain of the first route whose filter matches `topic`.
    pub fn route(&self, topic: &str) -> Option<Domain> {
        self.routes
            .iter()
            .find(|r| r.filter.matches(topic))
            .map(|r| r.domain)
    }

    /// Every filter to subscribe to.
    pub fn subscriptions(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| r.filter.as_str().to_string())
            .collect()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.set_topics(Domain::Navigation, vec!["vessels/+/navigation/#".to_string()]);
        settings.set_topics(Domain::Water, vec!["vessels/+/environment/water/+".to_string()]);
        settings.set_topics(Domain::BleTemperature, vec!["msh/+/ble".to_string()]);
        settings.set_topics(Domain::Gnss, vec!["vessels/+/navigation/gnss/#".to_string()]);
        settings
    }

    #[test]
    fn test_route_by_filter() {
        let table = RoutingTable::from_settings(&settings()).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.route("vessels/self/navigation/headingTrue"),
            Some(Domain::Navigation)
        );
        assert_eq!(
            table.route("vessels/self/environment/water/temperature"),
            Some(Domain::Water)
        );
        assert_eq!(table.route("msh/hub1/ble"), Some(Domain::BleTemperature));
        assert_eq!(table.route("unrelated/topic"), None);
    }

    #[test]
    fn test_first_match_in_configuration_order_wins() {
        // Navigation is subscribed ahead of GNSS, so its wider filter wins.
        let table = RoutingTable::from_settings(&settings()).unwrap();
        assert_eq!(
            table.route("vessels/self/navigation/gnss/satellites"),
            Some(Domain::Navigation)
        );

        let mut settings = Settings::default();
        settings.set_topics(Domain::Gnss, vec!["vessels/+/navigation/gnss/#".to_string()]);
        let table = RoutingTable::from_settings(&settings).unwrap();
        assert_eq!(
            table.route("vessels/self/navigation/gnss/satellites"),
            Some(Domain::Gnss)
        );
    }

    #[test]
    fn test_disabled_domains_are_not_routed() {
        let mut settings = settings();
        settings.subscriptions.set(Domain::Water, false);
        let table = RoutingTable::from_settings(&settings).unwrap();
        assert_eq!(table.route("vessels/self/environment/water/temperature"), None);
        assert!(!table
            .subscriptions()
            .contains(&"vessels/+/environment/water/+".to_string()));
    }

    #[test]
    fn test_invalid_filter_is_an_error() {
        let mut settings = Settings::default();
        settings.set_topics(Domain::Wind, vec!["a/#/b".to_string()]);
        assert!(RoutingTable::from_settings(&settings).is_err());
    }
}
