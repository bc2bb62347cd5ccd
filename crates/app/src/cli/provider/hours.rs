use std::str::FromStr;

use clap::{Args, Subcommand};
use jiff::civil::Time;
use uuid::Uuid;

use atelier_app::domain::providers::{ProvidersService, data::NewWorkingHour};

#[derive(Debug, Args)]
pub(crate) struct HoursCommand {
    #[command(subcommand)]
    command: HoursSubcommand,
}

#[derive(Debug, Subcommand)]
enum HoursSubcommand {
    /// Replace every working window of a provider
    Set(SetHoursArgs),
}

#[derive(Debug, Args)]
struct SetHoursArgs {
    /// Provider UUID
    #[arg(long)]
    provider_uuid: Uuid,

    /// Working window as DAY@HH:MM-HH:MM, e.g. tue@10:00-14:00; repeat for split shifts
    #[arg(long = "window", required = true)]
    windows: Vec<Window>,
}

/// One weekday window parsed from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window(NewWorkingHour);

impl FromStr for Window {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (day, range) = value
            .split_once('@')
            .ok_or_else(|| format!("expected DAY@HH:MM-HH:MM, got {value:?}"))?;

        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| format!("expected HH:MM-HH:MM, got {range:?}"))?;

        Ok(Self(NewWorkingHour {
            day_of_week: parse_day(day)?,
            starts_at: parse_time(start)?,
            ends_at: parse_time(end)?,
        }))
    }
}

/// Day names or numbers, 0 = Sunday.
fn parse_day(day: &str) -> Result<i8, String> {
    let day = day.trim().to_ascii_lowercase();

    let number = match day.as_str() {
        "sun" | "sunday" => 0,
        "mon" | "monday" => 1,
        "tue" | "tuesday" => 2,
        "wed" | "wednesday" => 3,
        "thu" | "thursday" => 4,
        "fri" | "friday" => 5,
        "sat" | "saturday" => 6,
        other => other
            .parse::<i8>()
            .ok()
            .filter(|number| (0..=6).contains(number))
            .ok_or_else(|| format!("unknown day {other:?}"))?,
    };

    Ok(number)
}

fn parse_time(time: &str) -> Result<Time, String> {
    time.trim()
        .parse::<Time>()
        .map_err(|error| format!("invalid time {time:?}: {error}"))
}

pub(crate) async fn run(service: &dyn ProvidersService, command: HoursCommand) -> Result<(), String> {
    match command.command {
        HoursSubcommand::Set(args) => set(service, args).await,
    }
}

async fn set(service: &dyn ProvidersService, args: SetHoursArgs) -> Result<(), String> {
    let hours = args.windows.into_iter().map(|window| window.0).collect();

    let records = service
        .set_working_hours(args.provider_uuid.into(), hours)
        .await
        .map_err(|error| format!("failed to set working hours: {error}"))?;

    for record in records {
        println!(
            "day {}: {}-{}",
            record.day_of_week, record.starts_at, record.ends_at
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::civil::time;

    use super::*;

    #[test]
    fn named_day_window_parses() -> Result<(), String> {
        let window: Window = "Tue@10:00-14:30".parse()?;

        assert_eq!(
            window.0,
            NewWorkingHour {
                day_of_week: 2,
                starts_at: time(10, 0, 0, 0),
                ends_at: time(14, 30, 0, 0),
            }
        );

        Ok(())
    }

    #[test]
    fn numeric_day_zero_is_sunday() -> Result<(), String> {
        let window: Window = "0@09:00-12:00".parse()?;

        assert_eq!(window.0.day_of_week, 0);

        Ok(())
    }

    #[test]
    fn malformed_windows_are_rejected() {
        assert!("mon 10:00-14:00".parse::<Window>().is_err());
        assert!("mon@10:00".parse::<Window>().is_err());
        assert!("7@10:00-14:00".parse::<Window>().is_err());
        assert!("mon@25:00-26:00".parse::<Window>().is_err());
    }
}
