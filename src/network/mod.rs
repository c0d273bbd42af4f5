//! The network module is the read-only window onto the station topology of
//! the surrounding simulation.  The topology, its edges and the load of the
//! downstream stations are owned by the engine; a decision station only
//! asks, per outgoing path, which station comes next and how busy it is.

use serde::{Deserialize, Serialize};

/// The current load of a downstream station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationLoad {
    pub station_id: String,
    pub queue_length: usize,
    pub wip: usize,
}

impl StationLoad {
    pub fn new(station_id: &str, queue_length: usize, wip: usize) -> Self {
        Self {
            station_id: station_id.to_string(),
            queue_length,
            wip,
        }
    }
}

/// The `TopologyView` trait is implemented by the engine for each decision
/// station.  `next_station` is the station directly at the end of the path,
/// and `next_process_station` is the first processing station reached along
/// the path, passing through any non-processing stations.  Either may be
/// `None` when the path leads nowhere of that kind.
pub trait TopologyView {
    fn path_count(&self) -> usize;
    fn next_station(&self, path: usize) -> Option<StationLoad>;
    fn next_process_station(&self, path: usize) -> Option<StationLoad>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathTarget {
    next: Option<StationLoad>,
    next_process: Option<StationLoad>,
}

/// A snapshot topology, held in memory.  Engines that keep station loads in
/// plain tables can update a `StaticTopology` as loads change, and tests
/// use it to stage downstream situations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticTopology {
    paths: Vec<PathTarget>,
}

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// A topology with `path_count` outgoing paths that lead nowhere.
    pub fn with_paths(path_count: usize) -> Self {
        Self {
            paths: vec![PathTarget::default(); path_count],
        }
    }

    /// A topology where every path ends directly at a processing station.
    pub fn from_stations(stations: Vec<StationLoad>) -> Self {
        Self {
            paths: stations
                .into_iter()
                .map(|station| PathTarget {
                    next: Some(station.clone()),
                    next_process: Some(station),
                })
                .collect(),
        }
    }

    /// Append a path, given its direct successor and its first processing
    /// station.
    pub fn add_path(&mut self, next: Option<StationLoad>, next_process: Option<StationLoad>) {
        self.paths.push(PathTarget { next, next_process });
    }

    /// Update the load of a station, wherever it appears in the topology.
    pub fn set_load(&mut self, station_id: &str, queue_length: usize, wip: usize) {
        self.paths
            .iter_mut()
            .flat_map(|path| path.next.iter_mut().chain(path.next_process.iter_mut()))
            .filter(|station| station.station_id == station_id)
            .for_each(|station| {
                station.queue_length = queue_length;
                station.wip = wip;
            });
    }
}

impl TopologyView for StaticTopology {
    fn path_count(&self) -> usize {
        self.paths.len()
    }

    fn next_station(&self, path: usize) -> Option<StationLoad> {
        self.paths.get(path).and_then(|target| target.next.clone())
    }

    fn next_process_station(&self, path: usize) -> Option<StationLoad> {
        self.paths
            .get(path)
            .and_then(|target| target.next_process.clone())
    }
}
