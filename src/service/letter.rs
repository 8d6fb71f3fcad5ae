//! Formal complaint letter generation
//!
//! Pure templating: every field is filled from the submission, nothing is
//! left as a placeholder.

use chrono::NaiveDate;
use regex::Regex;

use super::department::department_for;

const DEFAULT_CITY: &str = "Kanpur";
const DEFAULT_STATE: &str = "Uttar Pradesh";

const STATE_NAMES: [&str; 29] = [
    "Uttar Pradesh", "Maharashtra", "Karnataka", "Gujarat", "Rajasthan", "Punjab",
    "West Bengal", "Tamil Nadu", "Andhra Pradesh", "Madhya Pradesh", "Bihar", "Odisha",
    "Assam", "Haryana", "Kerala", "Jharkhand", "Chhattisgarh", "Delhi",
    "Himachal Pradesh", "Uttarakhand", "Goa", "Manipur", "Meghalaya", "Mizoram",
    "Nagaland", "Sikkim", "Tripura", "Arunachal Pradesh", "Telangana",
];

const METRO_CITIES: [&str; 9] = [
    "kanpur", "delhi", "mumbai", "bangalore", "chennai", "kolkata", "hyderabad", "pune", "ahmedabad",
];

const STATE_HINTS: [&str; 6] = ["Pradesh", "Bengal", "Nadu", "Kerala", "Gujarat", "Rajasthan"];

/// Inputs for one letter
#[derive(Debug, Clone)]
pub struct LetterDetails<'a> {
    pub issue_type: &'a str,
    pub description: Option<&'a str>,
    pub location: &'a str,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub priority: &'a str,
    pub department: Option<&'a str>,
    /// Printed as complaint reference and id
    pub reference: &'a str,
}

/// `potholes` -> `Potholes`, `damaged_signs` -> `Damaged Signs`
pub fn display_issue_type(issue_type: &str) -> String {
    let mut out = String::with_capacity(issue_type.len());
    let mut prev_alpha = false;

    for ch in issue_type.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }

    out
}

fn display_priority(priority: &str) -> &'static str {
    match priority {
        "low" => "Low",
        "high" => "High",
        "urgent" => "Urgent",
        _ => "Normal",
    }
}

/// Best-effort (city, state) from a comma separated address
pub fn extract_city_state(location: &str) -> (String, String) {
    let parts: Vec<&str> = if location.trim().is_empty() {
        Vec::new()
    } else {
        location.split(',').map(str::trim).collect()
    };

    let mut city: Option<&str> = None;
    let mut state: Option<&str> = None;

    // Area, City, District, State, Pincode, Country
    if parts.len() >= 4 {
        let hit = parts
            .iter()
            .enumerate()
            .find(|(_, part)| STATE_NAMES.iter().any(|name| part.contains(name)));
        if let Some((i, part)) = hit {
            state = Some(*part);
            if i > 0 {
                city = Some(parts[i - 1]);
            }
        }
    }

    if city.is_none() && parts.len() >= 2 {
        let metro = parts
            .iter()
            .copied()
            .find(|part| METRO_CITIES.contains(&part.to_lowercase().as_str()));
        city = metro.or_else(|| {
            let n = parts.len();
            Some(if n >= 3 { parts[n - 3] } else { parts[n - 2] })
        });
    }

    if state.is_none() && parts.len() >= 2 {
        state = parts
            .iter()
            .rev()
            .copied()
            .filter(|part| {
                let numeric = !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
                let lower = part.to_lowercase();
                !numeric && lower != "india" && lower != "indian"
            })
            .find(|part| STATE_HINTS.iter().any(|hint| part.contains(hint)));
    }

    (
        city.filter(|c| !c.is_empty()).unwrap_or(DEFAULT_CITY).to_string(),
        state.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_STATE).to_string(),
    )
}

fn default_description(issue_type: &str, display: &str, location: &str) -> String {
    match issue_type {
        "potholes" => format!("The road surface in {} has multiple potholes that are causing significant disruption to traffic flow and posing safety risks to vehicles and pedestrians.", location),
        "damaged_signs" => format!("Traffic signs or road signs in {} are damaged, missing, or illegible, which poses safety risks to motorists and pedestrians.", location),
        "fallen_trees" => format!("Fallen trees or tree branches in {} are blocking roads or pathways, creating obstacles and potential safety hazards.", location),
        "garbage" => format!("Garbage and waste accumulation in {} is causing health and environmental concerns, requiring immediate cleanup and waste management.", location),
        "graffiti" => format!("Unauthorized graffiti and vandalism in {} is affecting the aesthetic appearance of public spaces and may indicate security concerns.", location),
        "illegal_parking" => format!("Illegal parking in {} is obstructing traffic flow and creating safety hazards for vehicles and pedestrians.", location),
        "street_light" => format!("Street lights in {} are not functioning properly, creating safety concerns especially during nighttime hours.", location),
        "water_leak" => format!("Water leaks in {} are causing water wastage and potential damage to infrastructure and surrounding areas.", location),
        "traffic_signal" => format!("Traffic signals in {} are malfunctioning or not working, creating traffic congestion and safety risks.", location),
        "sidewalk_damage" => format!("Sidewalk damage in {} is creating hazards for pedestrians and requires immediate repair.", location),
        "drainage" => format!("Drainage issues in {} are causing water accumulation and potential flooding risks.", location),
        _ => format!("Civic infrastructure issue of type {} has been identified in {} and requires immediate attention to ensure public safety.", display.to_lowercase(), location),
    }
}

/// Strip bracketed placeholders and collapse runs of blank lines
fn clean_letter(letter: &str) -> String {
    let brackets = Regex::new(r"\[.*?\]").expect("static regex");
    let blank_runs = Regex::new(r"\n{3,}").expect("static regex");

    let letter = brackets.replace_all(letter, "");
    let letter = blank_runs.replace_all(&letter, "\n\n");
    letter.trim().to_string()
}

/// Render the complaint letter for `date`
pub fn generate_formal_complaint(details: &LetterDetails<'_>, date: NaiveDate) -> String {
    let display = display_issue_type(details.issue_type);
    let display_lower = display.to_lowercase();
    let location = details.location;
    let reference = details.reference;

    let (city, state) = extract_city_state(location);

    let coordinates = match (details.latitude, details.longitude) {
        (Some(lat), Some(lon)) => Some(format!("Latitude: {:.6}° N\nLongitude: {:.6}° E", lat, lon)),
        _ => None,
    };

    let priority_display = display_priority(details.priority);
    let department = details
        .department
        .unwrap_or_else(|| department_for(details.issue_type));
    let current_date = date.format("%B %d, %Y").to_string();

    let description = match details.description.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => default_description(details.issue_type, &display, location),
    };

    let coordinates_detail = coordinates
        .as_ref()
        .map(|c| format!("**Coordinates:**\n{}\n", c))
        .unwrap_or_else(|| "\n".to_string());
    let coordinates_location = coordinates
        .as_ref()
        .map(|c| format!("- **GPS Coordinates:** {}\n- **Captured from user's device GPS**\n", c))
        .unwrap_or_default();

    let urgency = if matches!(details.priority, "high" | "urgent") {
        format!(
            "Given the {} priority level, we request immediate action to address this matter.",
            priority_display.to_lowercase()
        )
    } else {
        "Prompt action is necessary to prevent further deterioration and ensure the safety of residents and commuters.".to_string()
    };

    let letter = format!(
        "Nagrik Nivedan Platform
Complaint Reference: {reference}

{current_date}

To,
The Municipal Commissioner,
{city} Municipal Corporation,
{city}, {state}, India.

**Subject: Formal Complaint Regarding {display} Issue in {location}**

Dear Sir/Madam,

This letter serves as a formal complaint regarding a {display_lower} issue that has been identified in {location} and requires immediate attention.

**COMPLAINT DETAILS:**

**Issue Type:** {display} (AI-Identified)
**Priority:** {priority_display} Priority
**Location:** {location}
{coordinates_detail}**Date:** {current_date}
**Assigned Department:** {department}
**Complaint ID:** {reference}

**DESCRIPTION:**

{description}

**LOCATION DETAILS:**

- **Full Address:** {location}
{coordinates_location}
**URGENCY ASSESSMENT:**

We consider this issue to be of **{priority_lower} priority**. The condition of the {display_lower} in {location} requires attention to ensure public safety and maintain service standards. {urgency}

**POTENTIAL SAFETY CONCERNS:**

The presence of this {display_lower} issue presents several potential safety concerns, including:
- Increased risk of accidents, particularly for vehicles and pedestrians
- Potential damage to vehicles and infrastructure
- Disruption to traffic flow and public safety
- Risk of injury to residents and commuters

**REQUEST FOR IMMEDIATE ACTION:**

We respectfully request that the {department} take immediate action to address this critical issue. Specifically, we request the following:

1. **Immediate Inspection:** Conduct a thorough inspection of the location in {location} to assess the extent of the {display_lower} issue.

2. **Assessment and Remediation:** Implement appropriate measures to resolve the {display_lower} issue and restore the area to a safe and usable condition.

3. **Preventative Measures:** Explore and implement preventative measures to prevent the recurrence of similar issues in the future, such as improved maintenance and use of durable materials.

4. **Status Updates:** Provide updates on the progress through our tracking system (Complaint ID: {reference}).

We believe that prompt action is essential to mitigate any risks associated with this issue and ensure the safety and well-being of the residents and commuters in {location}. We look forward to a timely response and a concrete plan of action to address this matter.

Thank you for your attention to this important issue.

Respectfully,

Nagrik Nivedan Platform
Complaint ID: {reference}
{current_date}",
        priority_lower = priority_display.to_lowercase(),
    );

    clean_letter(&letter)
}
