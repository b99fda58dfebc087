//! Radial distribution function accumulated over frames.

use crate::ops::neighbors::TypeFilter;
use crate::ops::pbc;
use crate::types::cloud::{PointCloud, SimBox, TopologyError};
use std::f64::consts::PI;

/// Pair-distance histogram normalised against an ideal gas of the same
/// density.
///
/// The maximum radius is clamped to half the smallest box edge and the
/// normalisation volume defaults to the box volume; both are fixed when the
/// histogram is created.
#[derive(Debug, Clone)]
pub struct Rdf {
    binwidth: f64,
    max_radius: f64,
    volume: f64,
    filter: TypeFilter,
    histogram: Vec<f64>,
    frames: usize,
    /// Sum over frames of `n * rho` for the selected particles.
    ideal_norm: f64,
}

impl Rdf {
    pub fn new(
        sim_box: &SimBox,
        binwidth: f64,
        max_radius: Option<f64>,
        volume: Option<f64>,
    ) -> Result<Self, TopologyError> {
        if !(binwidth > 0.0) || !binwidth.is_finite() {
            return Err(TopologyError::InvalidBinWidth(binwidth));
        }

        let half_box = 0.5 * sim_box.min_length();
        let max_radius = match max_radius {
            Some(r) if r > 0.0 && r <= half_box => r,
            Some(r) => {
                log::warn!("rdf max radius {r} is outside (0, {half_box}], using {half_box}");
                half_box
            }
            None => half_box,
        };

        let box_volume = sim_box.volume();
        let volume = match volume {
            Some(v) if v > 0.0 && v <= box_volume => v,
            Some(v) => {
                log::warn!("rdf volume {v} cannot be used, using the box volume {box_volume}");
                box_volume
            }
            None => box_volume,
        };

        let nbin = (max_radius / binwidth) as usize;
        Ok(Self {
            binwidth,
            max_radius,
            volume,
            filter: TypeFilter::All,
            histogram: vec![0.0; nbin],
            frames: 0,
            ideal_norm: 0.0,
        })
    }

    /// Restrict the pairs counted to the given particle types.
    pub fn with_types(mut self, filter: TypeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Raw pair counts; each pair adds 2, once for each member.
    pub fn histogram(&self) -> &[f64] {
        &self.histogram
    }

    /// Add the pairs of one frame to the histogram.
    pub fn accumulate(&mut self, cloud: &PointCloud) {
        let filter = self.filter.resolve(cloud);
        let selected: Vec<usize> = (0..cloud.len())
            .filter(|&i| match filter {
                TypeFilter::All => true,
                TypeFilter::Single(a) => cloud.points[i].type_id == a,
                TypeFilter::Pair(a, b) => {
                    let t = cloud.points[i].type_id;
                    t == a || t == b
                }
            })
            .collect();

        for (k, &i) in selected.iter().enumerate() {
            let pi = &cloud.points[i];
            for &j in &selected[k + 1..] {
                let pj = &cloud.points[j];
                if !filter.accepts(pi.type_id, pj.type_id) {
                    continue;
                }
                let r = pbc::distance(pi.position, pj.position, &cloud.sim_box);
                if r < self.max_radius {
                    if let Some(bin) = self.histogram.get_mut((r / self.binwidth) as usize) {
                        *bin += 2.0;
                    }
                }
            }
        }

        let n = selected.len() as f64;
        self.ideal_norm += n * n / self.volume;
        self.frames += 1;
    }

    /// Centre of each bin.
    pub fn radii(&self) -> Vec<f64> {
        (0..self.histogram.len())
            .map(|i| self.binwidth * (i as f64 + 0.5))
            .collect()
    }

    /// g(r) for every bin. All zeros before the first frame.
    pub fn normalized(&self) -> Vec<f64> {
        if self.ideal_norm == 0.0 {
            return vec![0.0; self.histogram.len()];
        }
        self.histogram
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let (inner, outer) = (i as f64, i as f64 + 1.0);
                let shell = 4.0 / 3.0 * PI * (outer.powi(3) - inner.powi(3)) * self.binwidth.powi(3);
                count / (self.ideal_norm * shell)
            })
            .collect()
    }

    /// Reset the counts, keeping the binning.
    pub fn clear(&mut self) {
        self.histogram.iter_mut().for_each(|b| *b = 0.0);
        self.frames = 0;
        self.ideal_norm = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cloud::Point;
    use approx::assert_relative_eq;
    use glam::DVec3;

    fn pair_cloud() -> PointCloud {
        let points = vec![
            Point::new(1, 1, DVec3::new(0.5, 5.0, 5.0)),
            Point::new(2, 2, DVec3::new(9.5, 5.0, 5.0)),
        ];
        PointCloud::from_points(points, SimBox::cubic(10.0).unwrap(), 0).unwrap()
    }

    #[test]
    fn test_defaults_and_clamping() {
        let b = SimBox::new(DVec3::new(10.0, 8.0, 12.0)).unwrap();
        let rdf = Rdf::new(&b, 0.5, Some(20.0), Some(-1.0)).unwrap();
        assert_eq!(rdf.max_radius(), 4.0);
        assert_eq!(rdf.volume(), 960.0);
        assert_eq!(rdf.histogram().len(), 8);
        assert!(Rdf::new(&b, 0.0, None, None).is_err());
    }

    #[test]
    fn test_pair_counted_twice_in_its_bin() {
        let cloud = pair_cloud();
        let mut rdf = Rdf::new(&cloud.sim_box, 0.5, None, None).unwrap();
        rdf.accumulate(&cloud);
        assert_eq!(rdf.histogram()[2], 2.0);
        assert_eq!(rdf.histogram().iter().sum::<f64>(), 2.0);

        let g = rdf.normalized();
        let shell = 4.0 / 3.0 * PI * (27.0 - 8.0) * 0.125;
        assert_relative_eq!(g[2], 2.0 / (4.0 / 1000.0 * shell), epsilon = 1e-9);
        assert_relative_eq!(rdf.radii()[2], 1.25);
    }

    #[test]
    fn test_accumulating_same_frame_keeps_shape() {
        let cloud = pair_cloud();
        let mut rdf = Rdf::new(&cloud.sim_box, 0.5, None, None).unwrap();
        rdf.accumulate(&cloud);
        let once = rdf.normalized();
        rdf.accumulate(&cloud);
        assert_eq!(rdf.frames(), 2);
        for (a, b) in once.iter().zip(rdf.normalized()) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }
        rdf.clear();
        assert_eq!(rdf.frames(), 0);
        assert!(rdf.normalized().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_type_filter_and_fallback() {
        let cloud = pair_cloud();
        let mut same = Rdf::new(&cloud.sim_box, 0.5, None, None)
            .unwrap()
            .with_types(TypeFilter::Single(1));
        same.accumulate(&cloud);
        assert_eq!(same.histogram().iter().sum::<f64>(), 0.0);

        let mut unknown = Rdf::new(&cloud.sim_box, 0.5, None, None)
            .unwrap()
            .with_types(TypeFilter::Pair(1, 7));
        unknown.accumulate(&cloud);
        assert_eq!(unknown.histogram().iter().sum::<f64>(), 2.0);
    }
}
