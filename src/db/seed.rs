use sqlx::SqlitePool;

use crate::db::{machines, safety_devices};

const MACHINES: &[(&str, &str)] = &[
    ("Machine A", "Production Floor"),
    ("Machine B", "Assembly Line 1"),
    ("Machine C", "Assembly Line 2"),
    ("CNC Mill", "Machine Shop"),
    ("Press 1", "Stamping Department"),
];

const DEVICES: &[(&str, &str, &str)] = &[
    ("Machine A", "Emergency Stop Button 1", "E-Stop"),
    ("Machine A", "Emergency Stop Button 2", "E-Stop"),
    ("Machine A", "Safety Light Curtain", "Light Curtain"),
    ("Machine B", "Emergency Stop Button", "E-Stop"),
    ("Machine B", "Safety Mat", "Pressure Mat"),
    ("Machine C", "Emergency Stop Button 1", "E-Stop"),
    ("Machine C", "Emergency Stop Button 2", "E-Stop"),
    ("CNC Mill", "Emergency Stop Button", "E-Stop"),
    ("CNC Mill", "Door Interlock", "Interlock"),
    ("Press 1", "Two-Hand Control", "Control"),
    ("Press 1", "Emergency Stop Button", "E-Stop"),
];

/// Insert the sample machines and devices. Safe to run on every start.
/// Returns the number of devices newly inserted.
pub async fn insert_sample_data(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    let mut inserted = 0;

    for (machine, location) in MACHINES {
        let machine_id = machines::ensure(pool, machine, location).await?;

        for (_, name, device_type) in DEVICES.iter().filter(|(m, _, _)| m == machine) {
            if safety_devices::ensure(pool, machine_id, name, device_type).await? {
                inserted += 1;
            }
        }
    }

    Ok(inserted)
}
