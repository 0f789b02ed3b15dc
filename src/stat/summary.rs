use super::label_unit;
use crate::{
    columns::UnitStyle,
    node::Node,
    value::{format_opt, parse_int, Factor},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitInt {
    pub unit: Option<String>,
    pub value: Option<i64>,
}

impl UnitInt {
    pub fn from_node(node: &Node, style: UnitStyle) -> Self {
        Self {
            unit: label_unit(node, "unit", style),
            value: parse_int(node.value()),
        }
    }

    pub fn rendered(&self) -> String {
        format_opt(self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFactorInt {
    pub unit: Option<String>,
    pub value: Option<i64>,
    pub factor: Factor,
}

impl UnitFactorInt {
    pub fn from_node(node: &Node, style: UnitStyle) -> Self {
        Self {
            unit: label_unit(node, "unit", style),
            value: parse_int(node.value()),
            factor: Factor::parse(node.field("factor")),
        }
    }

    pub fn rendered(&self) -> String {
        self.factor.scale(self.value)
    }
}

/// A configurable statistic enabled on the measurement point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryConfigurable {
    pub name: String,
    pub kind: String,
    pub unit: Option<String>,
}

impl SummaryConfigurable {
    fn from_node(node: &Node) -> Self {
        let unit = ["customUnit", "unit"]
            .into_iter()
            .find_map(|f| node.field(f).filter(|u| !u.is_empty()))
            .map(str::to_string);
        Self {
            name: node.field("name").unwrap_or_default().to_string(),
            kind: node.field("type").unwrap_or_default().to_string(),
            unit,
        }
    }

    /// `"type/unit"`.
    pub fn rendered(&self) -> String {
        format!("{}/{}", self.kind, self.unit.as_deref().unwrap_or_default())
    }
}

/// Capacity and utilisation summary of a measurement point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub kind: String,
    pub configured_capacity: Option<UnitInt>,
    pub effective_capacity: Option<UnitInt>,
    pub total_bytes: Option<UnitInt>,
    pub average_utilisation: Option<UnitInt>,
    pub network_service_indicator: Option<UnitFactorInt>,
    pub monitoring_mechanism: Option<String>,
    pub max_microburst: Option<UnitInt>,
    pub link_size_packet_delay: Option<UnitFactorInt>,
    pub link_size_queue_length: Option<UnitInt>,
    pub one_second_peak: Option<UnitInt>,
    pub recommendation: Option<String>,
    pub measures_messages: Option<bool>,
    pub packet_microburst_available: Option<bool>,
    pub configurable: Vec<SummaryConfigurable>,
}

impl Summary {
    pub fn from_node(node: &Node, style: UnitStyle) -> Self {
        let unit_int = |name: &str| node.child(name).map(|n| UnitInt::from_node(n, style));
        let text = |name: &str| node.field(name).map(str::to_string);
        let flag = |name: &str| node.field(name).and_then(parse_bool);

        // A negative indicator means the appliance has none to report.
        let network_service_indicator = node
            .child("networkServiceIndicator")
            .map(|n| UnitFactorInt::from_node(n, style))
            .filter(|nsi| nsi.value.map_or(false, |v| v > -1));

        let configurable = node
            .child("configurableStats")
            .map(|c| {
                c.children_named("configurableStat")
                    .map(SummaryConfigurable::from_node)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            kind: node.field("type").unwrap_or_default().to_string(),
            configured_capacity: unit_int("configuredCapacity"),
            effective_capacity: unit_int("effectiveCapacity"),
            total_bytes: unit_int("totalBytes"),
            average_utilisation: unit_int("averageUtilisation"),
            network_service_indicator,
            monitoring_mechanism: text("monitoringMechanism"),
            max_microburst: unit_int("maxMicroburst"),
            link_size_packet_delay: node
                .child("linkSizePacketDelay")
                .map(|n| UnitFactorInt::from_node(n, style)),
            link_size_queue_length: unit_int("linkSizeQueueLength"),
            one_second_peak: unit_int("oneSecondPeak"),
            recommendation: text("recommendation"),
            measures_messages: flag("measuresMessages"),
            packet_microburst_available: flag("packetMicroburstAvailable"),
            configurable,
        }
    }

    /// Unit of a unit-carrying field, by its response field name.
    pub fn unit(&self, field: &str) -> Option<&str> {
        let unit = match field {
            "configuredCapacity" => self.configured_capacity.as_ref().and_then(|u| u.unit.as_ref()),
            "effectiveCapacity" => self.effective_capacity.as_ref().and_then(|u| u.unit.as_ref()),
            "totalBytes" => self.total_bytes.as_ref().and_then(|u| u.unit.as_ref()),
            "oneSecondPeak" => self.one_second_peak.as_ref().and_then(|u| u.unit.as_ref()),
            "maxMicroburst" => self.max_microburst.as_ref().and_then(|u| u.unit.as_ref()),
            "linkSizePacketDelay" => self
                .link_size_packet_delay
                .as_ref()
                .and_then(|u| u.unit.as_ref()),
            "linkSizeQueueLength" => self
                .link_size_queue_length
                .as_ref()
                .and_then(|u| u.unit.as_ref()),
            _ => None,
        };
        unit.map(String::as_str)
    }

    /// Values in summary header order, without the configurable columns.
    pub fn cells(&self) -> Vec<String> {
        let unit_int = |v: &Option<UnitInt>| v.as_ref().map(UnitInt::rendered).unwrap_or_default();
        let unit_factor =
            |v: &Option<UnitFactorInt>| v.as_ref().map(UnitFactorInt::rendered).unwrap_or_default();
        let flag = |v: Option<bool>| v.map(|b| b.to_string()).unwrap_or_default();

        vec![
            unit_int(&self.configured_capacity),
            unit_int(&self.effective_capacity),
            unit_int(&self.total_bytes),
            unit_int(&self.average_utilisation),
            unit_factor(&self.network_service_indicator),
            flag(self.measures_messages),
            self.monitoring_mechanism.clone().unwrap_or_default(),
            unit_int(&self.one_second_peak),
            unit_int(&self.max_microburst),
            flag(self.packet_microburst_available),
            unit_factor(&self.link_size_packet_delay),
            unit_int(&self.link_size_queue_length),
            self.recommendation.clone().unwrap_or_default(),
        ]
    }

    pub fn configurable_value(&self, name: &str) -> Option<String> {
        self.configurable
            .iter()
            .find(|c| c.name == name)
            .map(SummaryConfigurable::rendered)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub mod tests {
    use super::Summary;
    use crate::{columns::UnitStyle, node::Node};

    fn summary() -> Node {
        Node::new("summary")
            .with_class("Summary")
            .with_attr("type", "summary")
            .with_child(Node::leaf("configuredCapacity", "1000000").with_attr("unit", "bps"))
            .with_child(Node::leaf("totalBytes", "4096").with_attr("unit", "bytes"))
            .with_child(
                Node::leaf("networkServiceIndicator", "-1")
                    .with_attr("unit", "%")
                    .with_attr("factor", "10"),
            )
            .with_child(
                Node::leaf("linkSizePacketDelay", "2500")
                    .with_attr("unit", "ms")
                    .with_attr("factor", "1000"),
            )
            .with_child(Node::leaf("monitoringMechanism", "tap"))
            .with_child(Node::leaf("measuresMessages", "true"))
            .with_child(Node::leaf("packetMicroburstAvailable", "false"))
            .with_child(
                Node::new("configurableStats").with_child(
                    Node::new("configurableStat")
                        .with_attr("name", "Orders")
                        .with_attr("type", "count")
                        .with_attr("unit", "msgs")
                        .with_attr("customUnit", "orders"),
                ),
            )
    }

    #[test]
    fn test_summary_cells() {
        let summary = Summary::from_node(&summary(), UnitStyle::Raw);
        assert!(summary.network_service_indicator.is_none());
        assert_eq!(summary.unit("configuredCapacity"), Some("bps"));
        assert_eq!(summary.unit("effectiveCapacity"), None);
        assert_eq!(
            summary.cells(),
            vec!["1000000", "", "4096", "", "", "true", "tap", "", "", "false", "2.5", "", ""]
        );
        assert_eq!(
            summary.configurable_value("Orders"),
            Some("count/orders".to_string())
        );
        assert_eq!(summary.configurable_value("Fills"), None);
    }

    #[test]
    fn test_summary_friendly_units() {
        let summary = Summary::from_node(&summary(), UnitStyle::Friendly);
        assert_eq!(summary.unit("configuredCapacity"), Some("kbits/s"));
    }

    #[test]
    fn test_network_service_indicator_kept_when_reported() {
        let node = Node::new("summary").with_child(
            Node::leaf("networkServiceIndicator", "35")
                .with_attr("unit", "%")
                .with_attr("factor", "10"),
        );
        let summary = Summary::from_node(&node, UnitStyle::Raw);
        assert_eq!(summary.cells()[4], "3.5");
    }
}
