//! Issue type to municipal department routing

pub const DEFAULT_DEPARTMENT: &str = "Public Works";

/// Department responsible for an issue type. Unknown types go to Public Works.
pub fn department_for(issue_type: &str) -> &'static str {
    match issue_type {
        // Classifier categories
        "damaged_signs" | "illegal_parking" => "Traffic Department",
        "fallen_trees" | "graffiti" | "potholes" => "Public Works",
        "garbage" => "Sanitation",

        // Legacy categories
        "pothole" | "street_light" | "sidewalk_damage" | "road_damage" | "bridge_issue"
        | "street_repair" => "Public Works",

        "water_leak" | "drainage" | "sewage_issue" | "water_supply" => "Water Department",

        "traffic_signal" | "traffic_sign" | "road_marking" | "traffic_light" => "Traffic Department",

        "waste_management" | "cleanliness" => "Sanitation",

        "health_issue" | "medical_emergency" | "sanitation_health" => "Health Department",

        "school_issue" | "education_facility" => "Education Department",

        _ => DEFAULT_DEPARTMENT,
    }
}
