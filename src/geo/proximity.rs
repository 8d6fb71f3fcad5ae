//! Distance filtering and heatmap clustering
//!
//! Both operate on the full complaint list with a linear scan; the data set
//! is the whole city's complaint history, fetched per request.

use serde::Serialize;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Default search radius for map queries
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Cluster membership threshold in degrees (~100 m)
pub const CLUSTER_RADIUS_DEG: f64 = 0.001;

/// Cluster size at which heatmap weight saturates
pub const CLUSTER_SATURATION: f64 = 5.0;

/// Great-circle distance between two points in kilometres
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Items within `radius_km` of `center`, paired with their distance.
/// Input order is preserved; items without coordinates are skipped.
pub fn within_radius<'a, T, F>(
    items: &'a [T],
    center: (f64, f64),
    radius_km: f64,
    position: F,
) -> Vec<(&'a T, f64)>
where
    F: Fn(&T) -> Option<(f64, f64)>,
{
    items
        .iter()
        .filter_map(|item| {
            let point = position(item)?;
            let distance = haversine_km(center, point);
            (distance <= radius_km).then_some((item, distance))
        })
        .collect()
}

/// A group of nearby points
#[derive(Debug, Clone)]
pub struct Cluster<'a, T> {
    pub center_lat: f64,
    pub center_lng: f64,
    pub members: Vec<&'a T>,
}

impl<T> Cluster<'_, T> {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Heatmap intensity in [0, 1]
    pub fn weight(&self) -> f64 {
        (self.members.len() as f64 / CLUSTER_SATURATION).min(1.0)
    }
}

/// Greedy clustering: each point joins the first cluster whose centre lies
/// strictly within `radius_deg` (planar degrees), else seeds a new one.
/// Centres never move.
pub fn cluster_points<'a, T, F>(items: &'a [T], radius_deg: f64, position: F) -> Vec<Cluster<'a, T>>
where
    F: Fn(&T) -> Option<(f64, f64)>,
{
    let mut clusters: Vec<Cluster<'a, T>> = Vec::new();

    for item in items {
        let Some((lat, lng)) = position(item) else {
            continue;
        };

        let existing = clusters.iter_mut().find(|c| {
            let d = ((lat - c.center_lat).powi(2) + (lng - c.center_lng).powi(2)).sqrt();
            d < radius_deg
        });

        match existing {
            Some(cluster) => cluster.members.push(item),
            None => clusters.push(Cluster {
                center_lat: lat,
                center_lng: lng,
                members: vec![item],
            }),
        }
    }

    clusters
}

/// Serializable heatmap point
#[derive(Debug, Clone, Serialize)]
pub struct HeatPoint<S> {
    pub lat: f64,
    pub lng: f64,
    pub weight: f64,
    pub count: usize,
    pub complaints: Vec<S>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(p: &(f64, f64)) -> Option<(f64, f64)> {
        Some(*p)
    }

    #[test]
    fn test_haversine_known_distance() {
        // Kanpur -> Lucknow, roughly 75 km
        let d = haversine_km((26.4499, 80.3319), (26.8467, 80.9462));
        assert!((d - 75.3).abs() < 1.0, "got {}", d);
        assert!(haversine_km((10.0, 10.0), (10.0, 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_km((0.0, 0.0), (1.0, 0.0));
        assert!((d - 111.19).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn test_within_radius_filters_and_keeps_order() {
        let points = vec![(0.0, 0.0), (0.0, 0.5), (0.0, 0.01), (f64::NAN, 0.0)];
        let hits = within_radius(&points, (0.0, 0.0), 5.0, pos);

        assert_eq!(hits.len(), 2);
        assert_eq!(*hits[0].0, (0.0, 0.0));
        assert!(hits[0].1.abs() < 1e-9);
        assert_eq!(*hits[1].0, (0.0, 0.01));
        assert!((hits[1].1 - 1.112).abs() < 0.01);
    }

    #[test]
    fn test_within_radius_skips_missing_coordinates() {
        let items = vec![Some((0.0, 0.0)), None];
        let hits = within_radius(&items, (0.0, 0.0), 1.0, |i| *i);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_cluster_first_match_wins() {
        let points = vec![
            (10.0, 10.0),
            (10.0005, 10.0),
            (10.0009, 10.0), // still inside the first centre
            (10.0015, 10.0), // outside first centre, seeds a new cluster
            (20.0, 20.0),
        ];
        let clusters = cluster_points(&points, CLUSTER_RADIUS_DEG, pos);

        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].count(), 3);
        assert_eq!((clusters[0].center_lat, clusters[0].center_lng), (10.0, 10.0));
        assert_eq!(clusters[1].count(), 1);
        assert_eq!(clusters[1].center_lat, 10.0015);
        assert_eq!(clusters[2].count(), 1);
    }

    #[test]
    fn test_cluster_weight_saturates() {
        let points = vec![(1.0, 1.0); 7];
        let clusters = cluster_points(&points, CLUSTER_RADIUS_DEG, pos);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count(), 7);
        assert_eq!(clusters[0].weight(), 1.0);

        let pair = vec![(1.0, 1.0); 2];
        let clusters = cluster_points(&pair, CLUSTER_RADIUS_DEG, pos);
        assert!((clusters[0].weight() - 0.4).abs() < 1e-12);
    }
}
