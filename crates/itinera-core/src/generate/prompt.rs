//! Prompt construction for the generation provider. Pure string building.

use super::parser::REQUEST_REJECTED;
use super::request::ItineraryRequest;

/// Output contract appended to every prompt.
const OUTPUT_CONTRACT: &str = r#"## Output Format

Answer with a single JSON array and nothing else. Each element is one
activity:

```json
[
  {
    "dayNumber": 1,
    "position": 1,
    "name": "Colosseum",
    "latitude": 41.8902,
    "longitude": 12.4922,
    "description": "Arrive early to beat the queue."
  }
]
```

- `dayNumber` starts at 1 and never exceeds the trip length.
- `position` starts at 1 within each day and follows visiting order.
- `latitude` is within [-90, 90]; `longitude` is within [-180, 180].
- `name` is the place's common name; `description` is one or two sentences.
"#;

/// Build the provider prompt for `request`.
pub fn build_prompt(request: &ItineraryRequest) -> String {
    let per_day = request.activities_per_day();
    let mut prompt = String::with_capacity(2048);

    prompt.push_str("# Trip Itinerary\n\n");
    prompt.push_str(&format!(
        "Plan a {days}-day {label} itinerary for {city}. \
         Schedule exactly {per_day} activities on each day, \
         {total} activities in total. Group nearby places on the same day.\n\n",
        days = request.duration_days,
        label = request.trip_intensity.label(),
        city = request.city_name.trim(),
        total = request.expected_total(),
    ));

    if let Some(notes) = request.notes() {
        prompt.push_str("## Traveller Notes\n\n");
        prompt.push_str(notes);
        prompt.push_str("\n\n");
    }

    prompt.push_str(OUTPUT_CONTRACT);
    prompt.push('\n');
    prompt.push_str(&format!(
        "If the request is not about travel or cannot be answered safely, \
         reply with exactly `{REQUEST_REJECTED}` instead of JSON.\n"
    ));

    prompt
}
