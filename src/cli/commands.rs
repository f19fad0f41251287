use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::{
    app::{init_config, AppState},
    constants::COLLECTION_SERVICE_REQUESTS,
    documents::{Document, DocumentStore},
    fleet::{
        describe_status, service_history, sort_status_by_device_name, ServiceRequest,
        SERVICE_ISSUES,
    },
    models::{Device, GroupId, UserProfile},
    utils::{format_phone_number, format_short_date, log_info, log_warn, string_has_value},
};

use super::{Commands, OutputFormat};

/// Handle CLI subcommands
pub async fn handle_command(command: &Commands, app: &AppState, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Init => init(),
        Commands::Auth => {
            app.gateway.authenticate().await?;
            println!("{}", "Signed in".green());
            Ok(())
        }
        Commands::Group { id } => {
            let groups = app.gateway.get_group(&GroupId::new(id.as_str())).await?;
            emit(format, &groups, || {
                for group in &groups {
                    let name = group.name.as_deref().unwrap_or("(unnamed)");
                    println!("  • {} {}", name.green(), format!("[{}]", group.id).dimmed());
                }
            })
        }
        Commands::Devices { groups } => {
            let devices = app.gateway.get_devices_by_groups(&group_ids(groups)).await?;
            emit(format, &devices, || print_devices(&devices))
        }
        Commands::Device { id } => match app.gateway.get_device_by_id(id).await? {
            Some(device) => emit(format, &device, || print_devices(std::slice::from_ref(&device))),
            None => {
                println!("No device with id '{}'", id);
                Ok(())
            }
        },
        Commands::Status { groups } => show_status(app, &group_ids(groups), format).await,
        Commands::Sync { uid } => sync(app, uid, format).await,
        Commands::History { uid, open } => show_history(app, uid.as_deref(), *open, format).await,
        Commands::Issues => {
            for (index, issue) in SERVICE_ISSUES.iter().enumerate() {
                println!("  {:>2}  {}", index, issue);
            }
            Ok(())
        }
        Commands::Request {
            uid,
            name,
            phone,
            tractor,
            issues,
            other,
        } => {
            let request = ServiceRequest {
                full_name: name.clone(),
                call_back_phone: phone.clone(),
                tractor_id: tractor.clone(),
                issues: issues.clone(),
                issue_other: other.clone(),
            };
            service_request(app, uid, request, format).await
        }
        Commands::Account {
            uid,
            name,
            customer,
        } => account(app, uid, name.as_deref(), customer.as_deref(), format).await,
    }
}

/// Write the default configuration file
pub fn init() -> Result<()> {
    println!("Initializing Fleetlink configuration...");
    match init_config()? {
        Some(path) => println!("Configuration written to {}", path.display()),
        None => println!("Configuration already exists, leaving it untouched"),
    }
    Ok(())
}

fn group_ids(groups: &[String]) -> Vec<GroupId> {
    groups.iter().map(|g| GroupId::new(g.as_str())).collect()
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn print_devices(devices: &[Device]) {
    if devices.is_empty() {
        println!("No devices");
        return;
    }
    for device in devices {
        let serial = device.serial_number.as_deref().unwrap_or("-");
        println!(
            "  • {} {} serial {}",
            device.name.green(),
            format!("[{}]", device.id).dimmed(),
            serial
        );
    }
}

/// Devices first so the status list can be ordered by device name
async fn show_status(app: &AppState, groups: &[GroupId], format: OutputFormat) -> Result<()> {
    let devices = app.gateway.get_devices_by_groups(groups).await?;
    let mut statuses = app.gateway.get_devices_status_info_by_groups(groups).await?;
    sort_status_by_device_name(&mut statuses, &devices);

    emit(format, &statuses, || {
        if statuses.is_empty() {
            println!("No status records");
        }
        for status in &statuses {
            println!("  {}", describe_status(status, &devices));
        }
    })
}

#[derive(Serialize)]
struct SyncReport<'a> {
    user: &'a UserProfile,
    groups: &'a [GroupId],
    devices: &'a [Device],
}

async fn sync(app: &AppState, uid: &str, format: OutputFormat) -> Result<()> {
    let fleet = app.fleet_sync()?;
    let user = fleet.load_user(uid).await?;
    let devices = fleet.sync().await?;
    let groups = app.session.groups();

    log_info(
        "sync",
        format!("{} groups, {} devices for {}", groups.len(), devices.len(), uid),
    );

    let report = SyncReport {
        user: &user,
        groups: &groups,
        devices: &devices,
    };
    emit(format, &report, || {
        println!("{} ({})", user.full_name.bold(), user.customer_name);
        if groups.is_empty() {
            println!("No groups are assigned to this user");
            return;
        }
        let names: Vec<&str> = groups.iter().map(GroupId::as_str).collect();
        println!("Groups: {}", names.join(", "));
        print_devices(&devices);
    })
}

fn requested_by(document: &Document, uid: &str) -> bool {
    document.fields.get("uid").and_then(|v| v.as_str()) == Some(uid)
}

async fn show_history(
    app: &AppState,
    uid: Option<&str>,
    open_only: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut documents = app.documents()?.list(COLLECTION_SERVICE_REQUESTS).await?;
    if let Some(uid) = uid {
        documents.retain(|d| requested_by(d, uid));
    }

    let mut history = service_history(&documents)?;
    if open_only {
        history.retain(|entry| entry.is_open());
    }

    emit(format, &history, || {
        if history.is_empty() {
            println!("No service requests");
        }
        for entry in &history {
            let status = if entry.is_open() {
                entry.status().yellow()
            } else {
                entry.status().green()
            };
            println!(
                "  {}  {:<12} {}  {}",
                format_short_date(entry.date_time),
                entry.tractor_id.as_deref().unwrap_or("-"),
                status,
                entry.issue.as_deref().unwrap_or_default()
            );
        }
    })
}

/// Blank name and phone come from the user's profile
fn fill_from_profile(request: &mut ServiceRequest, user: &UserProfile) {
    if !string_has_value(request.full_name.as_deref()) && string_has_value(Some(&user.full_name)) {
        request.full_name = Some(user.full_name.clone());
    }
    if !string_has_value(request.call_back_phone.as_deref()) {
        request.call_back_phone = user
            .phone_number
            .as_deref()
            .map(format_phone_number)
            .filter(|p| !p.is_empty());
    }
}

/// Load the user and their tractors, fill blanks from the profile, then
/// store the request
async fn service_request(
    app: &AppState,
    uid: &str,
    mut request: ServiceRequest,
    format: OutputFormat,
) -> Result<()> {
    let fleet = app.fleet_sync()?;
    let user = fleet.load_user(uid).await?;
    let devices = fleet.sync().await?;

    fill_from_profile(&mut request, &user);
    if let Some(tractor) = request.tractor_id.as_deref() {
        if !devices.is_empty() && !devices.iter().any(|d| d.name == tractor || d.id == tractor) {
            log_warn("request", format!("'{}' is not one of this user's tractors", tractor));
        }
    }

    let (id, record) = fleet
        .submit_request(uid, request, Utc::now().timestamp())
        .await?;

    emit(format, &record, || {
        println!("{} {}", "Service request submitted".green(), format!("[{}]", id).dimmed());
        println!("  Name:   {}", record.full_name);
        println!("  Phone:  {}", record.call_back_phone);
        println!("  Tractor: {}", record.tractor_id.as_deref().unwrap_or("-"));
        println!("  Issue:  {}", record.issue);
        if let Some(other) = &record.issue_other {
            println!("  Other:  {}", other);
        }
    })
}

async fn account(
    app: &AppState,
    uid: &str,
    name: Option<&str>,
    customer: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let fleet = app.fleet_sync()?;
    let mut user = fleet.load_user(uid).await?;

    if name.is_some() || customer.is_some() {
        if let Some(name) = name {
            user.full_name = name.trim().to_string();
        }
        if let Some(customer) = customer {
            user.customer_name = customer.trim().to_string();
        }
        fleet.save_user(uid, user.clone()).await?;
        log_info("account", format!("profile saved for {}", uid));
    }

    emit(format, &user, || {
        println!("  Full name: {}", user.full_name.bold());
        println!("  Customer:  {}", user.customer_name);
        if let Some(phone) = &user.phone_number {
            println!("  Phone:     {}", format_phone_number(phone));
        }
        if let Some(email) = &user.email {
            println!("  Email:     {}", email);
        }
    })
}
