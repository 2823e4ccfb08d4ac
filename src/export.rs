//! Kinematics description in the `.ini` layout read by the KDL solver device.
//!
//! ```text
//! numLinks 2
//! H0 (1 0 0 0 0 1 0 0 0 0 1 0.1 0 0 0 1)
//!
//! [link_0]
//! offset 0
//! D 0.5
//! A 1
//! alpha 90
//! ```
//!
//! DH segments become `[link_i]` groups (angles in degrees, lengths in meters).
//! Translation-only segments with any other joint type become `[xyzLink_i]`.
//! Fixed segments before the first link fold into `H0`, fixed segments after
//! the last link fold into `HN`.

use crate::chain::{Chain, JointType, Segment, frame_to_rows, rad_to_deg};
use crate::error::{ChainError, Result};
use glam::{DAffine3, DMat3};
use std::fmt::Write as _;

const EPS: f64 = 1e-9;
const DIGITS: f64 = 1e9;

/// Renders `chain` as a kinematics configuration file.
pub fn kinematics_ini(chain: &Chain) -> Result<String> {
    let mut h0 = DAffine3::IDENTITY;
    let mut hn = DAffine3::IDENTITY;
    let mut groups = Vec::new();
    let mut tail_start: Option<&str> = None;

    for segment in chain {
        if !segment.joint.is_actuated() {
            if groups.is_empty() {
                h0 = h0 * segment.tip;
            } else {
                hn = hn * segment.tip;
                if tail_start.is_none() {
                    tail_start = Some(segment.name.as_str());
                }
            }
            continue;
        }

        if let Some(fixed) = tail_start {
            return Err(ChainError::Export(format!(
                "fixed segment '{fixed}' sits between links"
            )));
        }
        groups.push(link_group(groups.len(), segment)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "numLinks {}", groups.len());
    if !h0.abs_diff_eq(DAffine3::IDENTITY, EPS) {
        let _ = writeln!(out, "H0 {}", matrix_list(&h0));
    }
    if !hn.abs_diff_eq(DAffine3::IDENTITY, EPS) {
        let _ = writeln!(out, "HN {}", matrix_list(&hn));
    }
    for group in groups {
        out.push('\n');
        out.push_str(&group);
    }
    Ok(out)
}

fn link_group(index: usize, segment: &Segment) -> Result<String> {
    let mut group = String::new();
    match segment.dh {
        Some(dh) if segment.joint.joint_type == JointType::RotZ && segment.joint.scale > 0.0 => {
            let _ = writeln!(group, "[link_{index}]");
            let _ = writeln!(group, "offset {}", number(rad_to_deg(dh.theta)));
            let _ = writeln!(group, "D {}", number(dh.d));
            let _ = writeln!(group, "A {}", number(dh.a));
            let _ = writeln!(group, "alpha {}", number(rad_to_deg(dh.alpha)));
        }
        _ if segment.tip.matrix3.abs_diff_eq(DMat3::IDENTITY, EPS) => {
            let t = segment.tip.translation;
            let _ = writeln!(group, "[xyzLink_{index}]");
            let _ = writeln!(group, "x {}", number(t.x));
            let _ = writeln!(group, "y {}", number(t.y));
            let _ = writeln!(group, "z {}", number(t.z));
            let _ = writeln!(group, "Type {}", segment.joint.kinematic_name());
        }
        _ => {
            return Err(ChainError::Export(format!(
                "segment '{}' is neither a RotZ DH link nor a pure translation",
                segment.name
            )));
        }
    }
    Ok(group)
}

fn matrix_list(frame: &DAffine3) -> String {
    let values: Vec<String> = frame_to_rows(frame)
        .iter()
        .flatten()
        .map(|v| number(*v))
        .collect();
    format!("({})", values.join(" "))
}

/// Rounds away conversion noise such as `90.00000000000001`.
fn number(value: f64) -> String {
    let rounded = (value * DIGITS).round() / DIGITS;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting() {
        assert_eq!(number(90.00000000000001), "90");
        assert_eq!(number(-0.0), "0");
        assert_eq!(number(0.5), "0.5");
        assert_eq!(number(-90.0), "-90");
    }
}
