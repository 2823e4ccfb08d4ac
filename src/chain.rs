use glam::{DAffine3, DMat3, DVec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A 4x4 homogeneous transform written row by row, as it appears in
/// kinematics configuration files.
pub type RowMajorMatrix = [[f64; 4]; 4];

/// The serial kinematic chain of a robot arm.
///
/// Segments are stored in the order they were appended, from the base of
/// the arm towards the tool. The chain is append-only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Chain {
    segments: Vec<Segment>,
}

impl Chain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `segment` at the tool end.
    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// All segments, base first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates segments from the base.
    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Number of segments, fixed ones included.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of segments whose joint can move (fixed joints excluded).
    pub fn joint_count(&self) -> usize {
        self.segments.iter().filter(|s| s.joint.is_actuated()).count()
    }

    /// True before the first segment is appended.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// One link of the chain: a joint followed by the rigid transform to the next frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Segment {
    /// Name from the first column of the DH table (or `H0`/`HN` for fixed frames).
    pub name: String,

    /// The joint at the base of this segment.
    pub joint: Joint,

    /// Transform from the joint frame to the segment tip, with the joint at zero.
    pub tip: DAffine3,

    /// The resolved DH parameters this segment was built from, if any.
    pub dh: Option<DhParameters>,
}

impl Segment {
    /// Creates a segment with an arbitrary tip frame and no DH parameters.
    pub fn new(name: impl Into<String>, joint: Joint, tip: DAffine3) -> Self {
        Self {
            name: name.into(),
            joint,
            tip,
            dh: None,
        }
    }

    /// Creates a segment whose tip frame is the DH transform of `params`.
    pub fn from_dh(name: impl Into<String>, joint: Joint, params: DhParameters) -> Self {
        Self {
            name: name.into(),
            joint,
            tip: params.frame(),
            dh: Some(params),
        }
    }

    /// Pose of the segment tip relative to its base for joint position `q`.
    pub fn pose(&self, q: f64) -> DAffine3 {
        self.joint.pose(q) * self.tip
    }
}

/// Denavit-Hartenberg parameters in SI units (meters, radians).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DhParameters {
    /// Link length along the common normal.
    pub a: f64,
    /// Link twist about the common normal.
    pub alpha: f64,
    /// Link offset along the previous Z axis.
    pub d: f64,
    /// Joint angle offset about the previous Z axis.
    pub theta: f64,
}

impl DhParameters {
    pub fn new(a: f64, alpha: f64, d: f64, theta: f64) -> Self {
        Self { a, alpha, d, theta }
    }

    /// See [`dh_frame`].
    pub fn frame(&self) -> DAffine3 {
        dh_frame(self.a, self.alpha, self.d, self.theta)
    }
}

/// Types of single degree-of-freedom joints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointType {
    /// No motion (welded frame).
    Fixed,
    RotX,
    RotY,
    /// Rotation about the local Z axis, the DH convention.
    #[default]
    RotZ,
    TransX,
    TransY,
    TransZ,
}

impl JointType {
    /// The unit axis of motion, `None` for fixed joints.
    pub fn axis(self) -> Option<DVec3> {
        match self {
            Self::Fixed => None,
            Self::RotX | Self::TransX => Some(DVec3::X),
            Self::RotY | Self::TransY => Some(DVec3::Y),
            Self::RotZ | Self::TransZ => Some(DVec3::Z),
        }
    }

    pub fn is_rotational(self) -> bool {
        matches!(self, Self::RotX | Self::RotY | Self::RotZ)
    }

    pub fn is_translational(self) -> bool {
        matches!(self, Self::TransX | Self::TransY | Self::TransZ)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fixed => "None",
            Self::RotX => "RotX",
            Self::RotY => "RotY",
            Self::RotZ => "RotZ",
            Self::TransX => "TransX",
            Self::TransY => "TransY",
            Self::TransZ => "TransZ",
        }
    }
}

/// A joint of a given type. A scale of `-1.0` inverts the direction of motion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub joint_type: JointType,
    pub scale: f64,
}

impl Default for Joint {
    fn default() -> Self {
        Self::rot_z()
    }
}

impl Joint {
    pub fn new(joint_type: JointType) -> Self {
        Self {
            joint_type,
            scale: 1.0,
        }
    }

    /// Revolute joint about local Z.
    pub fn rot_z() -> Self {
        Self::new(JointType::RotZ)
    }

    pub fn fixed() -> Self {
        Self::new(JointType::Fixed)
    }

    pub fn inverted(self) -> Self {
        Self {
            scale: -self.scale,
            ..self
        }
    }

    pub fn is_actuated(&self) -> bool {
        self.joint_type != JointType::Fixed
    }

    /// Name used by kinematics configuration files, e.g. `RotZ` or `InvTransX`.
    pub fn kinematic_name(&self) -> String {
        if self.scale < 0.0 && self.is_actuated() {
            format!("Inv{}", self.joint_type.name())
        } else {
            self.joint_type.name().to_string()
        }
    }

    /// Motion produced by the joint at position `q` (radians or meters).
    pub fn pose(&self, q: f64) -> DAffine3 {
        let amount = self.scale * q;
        match self.joint_type.axis() {
            None => DAffine3::IDENTITY,
            Some(axis) if self.joint_type.is_rotational() => {
                DAffine3::from_axis_angle(axis, amount)
            }
            Some(axis) => DAffine3::from_translation(axis * amount),
        }
    }
}

/// The classic Denavit-Hartenberg transform `Rz(theta) * Tz(d) * Tx(a) * Rx(alpha)`.
pub fn dh_frame(a: f64, alpha: f64, d: f64, theta: f64) -> DAffine3 {
    let (st, ct) = theta.sin_cos();
    let (sa, ca) = alpha.sin_cos();
    let rotation = DMat3::from_cols(
        DVec3::new(ct, st, 0.0),
        DVec3::new(-st * ca, ct * ca, sa),
        DVec3::new(st * sa, -ct * sa, ca),
    );
    DAffine3::from_mat3_translation(rotation, DVec3::new(a * ct, a * st, d))
}

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Converts a row-major homogeneous matrix into a rigid transform.
///
/// Returns `None` unless the last row is `0 0 0 1` and the rotation block is
/// orthonormal with determinant 1.
pub fn frame_from_rows(rows: &RowMajorMatrix) -> Option<DAffine3> {
    const EPS: f64 = 1e-6;
    let [r0, r1, r2, r3] = rows;
    let bottom_ok = r3[0].abs() < EPS && r3[1].abs() < EPS && r3[2].abs() < EPS;
    if !bottom_ok || (r3[3] - 1.0).abs() >= EPS {
        return None;
    }

    let rotation = DMat3::from_cols(
        DVec3::new(r0[0], r1[0], r2[0]),
        DVec3::new(r0[1], r1[1], r2[1]),
        DVec3::new(r0[2], r1[2], r2[2]),
    );
    let orthonormal = (rotation.transpose() * rotation).abs_diff_eq(DMat3::IDENTITY, EPS);
    if !orthonormal || (rotation.determinant() - 1.0).abs() >= EPS {
        return None;
    }

    Some(DAffine3::from_mat3_translation(
        rotation,
        DVec3::new(r0[3], r1[3], r2[3]),
    ))
}

/// Writes a rigid transform as a row-major homogeneous matrix.
pub fn frame_to_rows(frame: &DAffine3) -> RowMajorMatrix {
    let m = frame.matrix3;
    let t = frame.translation;
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().take(3).enumerate() {
        row[0] = m.x_axis[r];
        row[1] = m.y_axis[r];
        row[2] = m.z_axis[r];
        row[3] = t[r];
    }
    rows[3][3] = 1.0;
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn angle_conversion() {
        assert!((deg_to_rad(180.0) - PI).abs() < EPS);
        assert_eq!(deg_to_rad(0.0), 0.0);
        assert!((deg_to_rad(90.0) - PI / 2.0).abs() < EPS);
        assert!((rad_to_deg(PI) - 180.0).abs() < EPS);
    }

    #[test]
    fn zero_dh_frame_is_identity() {
        assert!(dh_frame(0.0, 0.0, 0.0, 0.0).abs_diff_eq(DAffine3::IDENTITY, EPS));
    }

    #[test]
    fn dh_frame_translates_along_a_and_d() {
        let f = dh_frame(0.3, 0.0, 0.2, 0.0);
        assert!(f.translation.abs_diff_eq(DVec3::new(0.3, 0.0, 0.2), EPS));
        assert!(f.matrix3.abs_diff_eq(DMat3::IDENTITY, EPS));
    }

    #[test]
    fn dh_frame_twist_maps_y_to_z() {
        let f = dh_frame(1.0, PI / 2.0, 0.5, 0.0);
        let y = f.transform_vector3(DVec3::Y);
        assert!(y.abs_diff_eq(DVec3::Z, EPS));
        assert!(f.translation.abs_diff_eq(DVec3::new(1.0, 0.0, 0.5), EPS));
    }

    #[test]
    fn dh_frame_matches_composition() {
        let (a, alpha, d, theta) = (0.4, 0.7, -0.1, 1.3);
        let composed = DAffine3::from_rotation_z(theta)
            * DAffine3::from_translation(DVec3::new(0.0, 0.0, d))
            * DAffine3::from_translation(DVec3::new(a, 0.0, 0.0))
            * DAffine3::from_rotation_x(alpha);
        assert!(dh_frame(a, alpha, d, theta).abs_diff_eq(composed, 1e-9));
    }

    #[test]
    fn rot_z_segment_pose_rotates_tip() {
        let seg = Segment::from_dh("s", Joint::rot_z(), DhParameters::new(1.0, 0.0, 0.0, 0.0));
        let p = seg.pose(PI / 2.0).translation;
        assert!(p.abs_diff_eq(DVec3::new(0.0, 1.0, 0.0), EPS));

        let inv = Segment::new("s", Joint::rot_z().inverted(), seg.tip);
        let p = inv.pose(PI / 2.0).translation;
        assert!(p.abs_diff_eq(DVec3::new(0.0, -1.0, 0.0), EPS));
    }

    #[test]
    fn prismatic_joint_translates() {
        let joint = Joint::new(JointType::TransX);
        assert!(joint.pose(0.25).translation.abs_diff_eq(DVec3::new(0.25, 0.0, 0.0), EPS));
        assert_eq!(joint.inverted().kinematic_name(), "InvTransX");
        assert_eq!(Joint::fixed().inverted().kinematic_name(), "None");
    }

    #[test]
    fn joint_count_skips_fixed_segments() {
        let mut chain = Chain::new();
        chain.add_segment(Segment::new("H0", Joint::fixed(), DAffine3::IDENTITY));
        chain.add_segment(Segment::new("j1", Joint::rot_z(), DAffine3::IDENTITY));
        chain.add_segment(Segment::new("j2", Joint::rot_z(), DAffine3::IDENTITY));
        assert_eq!(chain.segment_count(), 3);
        assert_eq!(chain.joint_count(), 2);
    }

    #[test]
    fn row_major_round_trip() {
        let frame = dh_frame(0.1, 0.2, 0.3, 0.4);
        let rows = frame_to_rows(&frame);
        assert_eq!(rows[3], [0.0, 0.0, 0.0, 1.0]);
        let back = frame_from_rows(&rows).unwrap();
        assert!(back.abs_diff_eq(frame, 1e-12));
    }

    #[test]
    fn non_rigid_rows_are_rejected() {
        let mut rows = frame_to_rows(&DAffine3::IDENTITY);
        rows[0][0] = 2.0;
        assert!(frame_from_rows(&rows).is_none());

        let mut rows = frame_to_rows(&DAffine3::IDENTITY);
        rows[3][0] = 1.0;
        assert!(frame_from_rows(&rows).is_none());
    }
}
