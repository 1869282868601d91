use serde_json::{json, Value};

/// Knee joints for both sides; the proximal joint sits straight above the
/// vertex and the distal joint is rotated so the knee angle is `angle`.
pub fn squat_frame(ts: u64, angle: f64, score: f64) -> Value {
    let mut keypoints = Vec::with_capacity(6);
    for (side, vx) in [("left", 200.0_f64), ("right", 400.0_f64)] {
        let vy = 300.0_f64;
        let theta = angle.to_radians();
        keypoints.push(json!({ "name": format!("{side}_hip"), "x": vx, "y": vy - 100.0, "score": score }));
        keypoints.push(json!({ "name": format!("{side}_knee"), "x": vx, "y": vy, "score": score }));
        keypoints.push(json!({
            "name": format!("{side}_ankle"),
            "x": vx + 100.0 * theta.sin(),
            "y": vy - 100.0 * theta.cos(),
            "score": score,
        }));
    }
    json!({ "timestampMs": ts, "keypoints": keypoints })
}

pub fn squat_frames(angles: &[f64], start: u64) -> Vec<Value> {
    angles
        .iter()
        .enumerate()
        .map(|(i, angle)| squat_frame(start + i as u64 * 100, *angle, 0.9))
        .collect()
}

/// One full squat: down through the lower threshold and back up.
pub const ONE_SQUAT: [f64; 7] = [170.0, 150.0, 120.0, 90.0, 120.0, 150.0, 172.0];
