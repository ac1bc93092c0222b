use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use escalation_core::decision::{as_hours, hours_to_duration};
use escalation_core::{decide, incident_age};
use serde_json::json;

#[derive(Args)]
pub struct DecideArgs {
    /// Incident creation date (YYYY-MM-DD)
    #[arg(long)]
    created_on: NaiveDate,
    /// Customer escalation time in hours; omit for an unconfigured customer
    #[arg(long)]
    hours: Option<f64>,
    /// Evaluation time (RFC 3339), defaults to now
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

pub fn run(args: DecideArgs) -> Result<(), Box<dyn std::error::Error>> {
    let now = args.now.unwrap_or_else(Utc::now);
    let threshold = match args.hours {
        Some(hours) => {
            let threshold = hours_to_duration(hours)
                .ok_or_else(|| format!("escalation time out of range: {hours}"))?;
            Some(threshold)
        }
        None => None,
    };

    let decision = decide(now, args.created_on, threshold);
    let output = json!({
        "decision": decision,
        "age_hours": as_hours(incident_age(now, args.created_on)),
        "escalation_hours": args.hours,
        "now": now.to_rfc3339(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
