use obstacles::{
    CallContext, Dependencies, ObstacleSegmenter, ObstaclesConfig, PointCloud, StaticSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Synthetic frame: a 4 m x 4 m floor with two boxes standing on it
    let mut cloud = PointCloud::new();
    for i in 0..80 {
        for j in 0..80 {
            let x = i as f32 * 50.0;
            let y = j as f32 * 50.0;
            cloud.insert([x, y, ((i * 7 + j * 13) % 5) as f32])?;
        }
    }
    for (cx, cy) in [(1000.0f32, 1000.0f32), (3000.0, 2500.0)] {
        for i in 0..10 {
            for j in 0..10 {
                for k in 0..10 {
                    cloud.insert([
                        cx + i as f32 * 30.0,
                        cy + j as f32 * 30.0,
                        200.0 + k as f32 * 30.0,
                    ])?;
                }
            }
        }
    }
    println!("Frame: {} points", cloud.len());

    // Distances are in millimetres, as a depth camera reports them
    let config: ObstaclesConfig = serde_json::from_str(
        r#"{
            "min_points_in_plane": 1000,
            "max_dist_from_plane_mm": 20,
            "min_points_in_segment": 50,
            "ground_angle_tolerance_degs": 30,
            "clustering_radius": 40,
            "clustering_strictness": 4,
            "camera_name": "depth"
        }"#,
    )?;

    let deps = Dependencies::new().with("depth", StaticSource::new(cloud));
    let segmenter = ObstacleSegmenter::register("obstacles", Some(&config), &deps)?;

    let objects = segmenter.object_point_clouds("", &CallContext::new())?;
    println!("Found {} obstacles", objects.len());
    for (i, object) in objects.iter().enumerate() {
        println!(
            "  #{}: {} points, center={:?}, extents={:?}",
            i,
            object.len(),
            object.center(),
            object.extents()
        );
    }
    Ok(())
}
