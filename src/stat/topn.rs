use super::series::SeriesBase;
use crate::{
    node::Node,
    value::{format_float, format_opt, format_sample, parse_int, parse_samples, Sample},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopNEntry {
    pub key: String,
    pub byte_count: Option<i64>,
    pub byte_count_percentage: Option<f64>,
    pub packet_count: Option<i64>,
    pub flow_count: Option<i64>,
    pub bit_rate: Option<i64>,
    pub application: Option<String>,
}

impl TopNEntry {
    pub fn from_node(node: &Node) -> Self {
        Self {
            key: node.field("key").unwrap_or_default().to_string(),
            byte_count: parse_int(node.field("byteCount")),
            byte_count_percentage: node
                .field("byteCountPercentage")
                .and_then(|p| p.trim().parse().ok()),
            packet_count: parse_int(node.field("packetCount")),
            flow_count: parse_int(node.field("flowCount")),
            bit_rate: parse_int(node.field("bitRate")),
            application: node.field("application").map(str::to_string),
        }
    }

    /// Byte count through application, in `#topn data` column order.
    pub fn cells(&self) -> Vec<String> {
        vec![
            format_opt(self.byte_count),
            self.byte_count_percentage.map(format_float).unwrap_or_default(),
            format_opt(self.packet_count),
            format_opt(self.flow_count),
            format_opt(self.bit_rate),
            self.application.clone().unwrap_or_default(),
        ]
    }
}

/// Ranked traffic keys over the reporting period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopN {
    pub kind: String,
    pub entries: Vec<TopNEntry>,
    pub total_bytes: Option<i64>,
    pub total_packets: Option<i64>,
    pub total_flows: Option<i64>,
    pub max_error: Option<i64>,
    pub availability: Option<i64>,
    pub period_ends_at: Option<i64>,
}

impl TopN {
    pub fn from_node(node: &Node) -> Self {
        Self {
            kind: node.field("type").unwrap_or_default().to_string(),
            entries: node.children_named("entry").map(TopNEntry::from_node).collect(),
            total_bytes: parse_int(node.field("totalBytes")),
            total_packets: parse_int(node.field("totalPackets")),
            total_flows: parse_int(node.field("totalFlows")),
            max_error: parse_int(node.field("maxError")),
            availability: parse_int(node.field("availability")),
            period_ends_at: parse_int(node.field("periodEndsAt")),
        }
    }

    pub fn totals(&self) -> Vec<String> {
        [
            self.total_bytes,
            self.total_packets,
            self.total_flows,
            self.max_error,
            self.availability,
            self.period_ends_at,
        ]
        .into_iter()
        .map(format_opt)
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyData {
    pub key: String,
    pub bit_rate: Vec<Sample>,
    pub packet_rate: Vec<Sample>,
}

impl KeyData {
    pub fn from_node(node: &Node) -> Self {
        Self {
            key: node.field("key").unwrap_or_default().to_string(),
            bit_rate: parse_samples(node.field("bitRate")),
            packet_rate: parse_samples(node.field("packetRate")),
        }
    }
}

/// Top-N keys reported per time bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeriesTopN {
    pub kind: String,
    pub base: SeriesBase,
    pub key_data: Vec<KeyData>,
}

impl TimeSeriesTopN {
    pub fn from_node(node: &Node) -> Self {
        Self {
            kind: node.field("type").unwrap_or_default().to_string(),
            base: SeriesBase::from_node(node),
            key_data: node.children_named("keyData").map(KeyData::from_node).collect(),
        }
    }

    /// `(start, end, bit rate, packet rate)` for each bucket of `key_data`,
    /// stopping at the shortest list.
    pub fn buckets<'a>(&'a self, key_data: &'a KeyData) -> impl Iterator<Item = (i64, i64, String, String)> + 'a {
        self.base
            .start_times
            .iter()
            .zip(&self.base.end_times)
            .zip(key_data.bit_rate.iter().zip(&key_data.packet_rate))
            .map(|((start, end), (bits, packets))| {
                (*start, *end, format_sample(*bits), format_sample(*packets))
            })
    }
}

#[cfg(test)]
pub mod tests {
    use super::{TimeSeriesTopN, TopN};
    use crate::node::Node;

    #[test]
    fn test_top_n() {
        let node = Node::new("topTalkers")
            .with_class("TopN")
            .with_attr("type", "top-talkers")
            .with_child(Node::leaf("totalBytes", "1000"))
            .with_child(Node::leaf("availability", "100"))
            .with_child(
                Node::new("entry")
                    .with_child(Node::leaf("key", "10.0.0.1"))
                    .with_child(Node::leaf("byteCount", "600"))
                    .with_child(Node::leaf("byteCountPercentage", "60"))
                    .with_child(Node::leaf("application", "http")),
            );
        let top = TopN::from_node(&node);
        assert_eq!(top.kind, "top-talkers");
        assert_eq!(top.totals(), vec!["1000", "", "", "", "100", ""]);
        assert_eq!(top.entries.len(), 1);
        assert_eq!(top.entries[0].key, "10.0.0.1");
        assert_eq!(
            top.entries[0].cells(),
            vec!["600", "60.0", "", "", "", "http"]
        );
    }

    #[test]
    fn test_time_series_top_n_buckets() {
        let node = Node::new("talkers")
            .with_class("TimeSeriesTopN")
            .with_attr("type", "talkers")
            .with_child(Node::leaf("startTimes", "0 60 120"))
            .with_child(Node::leaf("endTimes", "60 120 180"))
            .with_child(
                Node::new("keyData")
                    .with_attr("key", "udp")
                    .with_child(Node::leaf("bitRate", "8 - 4"))
                    .with_child(Node::leaf("packetRate", "1 2")),
            );
        let top = TimeSeriesTopN::from_node(&node);
        let key_data = &top.key_data[0];
        assert_eq!(key_data.key, "udp");

        let buckets: Vec<_> = top.buckets(key_data).collect();
        assert_eq!(
            buckets,
            vec![
                (0, 60, "8".to_string(), "1".to_string()),
                (60, 120, "".to_string(), "2".to_string()),
            ]
        );
    }
}
