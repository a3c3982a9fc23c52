use colored::Colorize;

use crate::engine::audit::format_time;
use crate::engine::part_demand::{PartAvailability, PartsSummary};
use crate::engine::report::{JobProgress, JobTree};
use crate::state::models::{
    ActionStatus, Comment, JobStatus, LoadedTemplate, MaintenanceActionSet, PartDemandStatus,
    TemplateActionSet,
};

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg.green());
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg.red());
}

fn job_status(status: JobStatus) -> String {
    match status {
        JobStatus::Planned => status.as_str().blue().to_string(),
        JobStatus::InProgress => status.as_str().cyan().to_string(),
        JobStatus::Delayed => status.as_str().yellow().to_string(),
        JobStatus::Complete => status.as_str().green().to_string(),
        JobStatus::Cancelled => status.as_str().dimmed().to_string(),
    }
}

fn action_status(status: ActionStatus) -> String {
    match status {
        ActionStatus::NotStarted => status.as_str().normal().to_string(),
        ActionStatus::InProgress => status.as_str().cyan().to_string(),
        ActionStatus::Completed => status.as_str().green().to_string(),
        ActionStatus::Skipped => status.as_str().yellow().to_string(),
        ActionStatus::Cancelled => status.as_str().dimmed().to_string(),
    }
}

fn demand_status(status: PartDemandStatus) -> String {
    match status {
        PartDemandStatus::Planned => status.as_str().blue().to_string(),
        PartDemandStatus::Received => status.as_str().cyan().to_string(),
        PartDemandStatus::Used => status.as_str().green().to_string(),
        PartDemandStatus::Cancelled => status.as_str().dimmed().to_string(),
    }
}

/// Print a list of jobs.
pub fn print_job_list(jobs: &[MaintenanceActionSet]) {
    if jobs.is_empty() {
        println!("{}", "No maintenance jobs.".dimmed());
        return;
    }

    println!();
    println!("{}", "Maintenance Jobs".bold().cyan());
    println!("{}", "─".repeat(96));
    println!(
        "  {:<38} {:<24} {:<16} {:<12} {}",
        "ID".bold(),
        "TASK".bold(),
        "ASSET".bold(),
        "STATUS".bold(),
        "PRIORITY".bold()
    );
    println!("{}", "─".repeat(96));

    for job in jobs {
        println!(
            "  {:<38} {:<24} {:<16} {:<12} {}",
            job.id,
            job.task_name,
            job.asset_id,
            job_status(job.status),
            job.priority.as_str().dimmed()
        );
    }

    println!();
    println!("  {} job(s) total.", jobs.len());
    println!();
}

/// Print a job with its actions, part demands, tools and delays.
pub fn print_job_tree(tree: &JobTree) {
    let job = &tree.job;
    println!();
    println!("{} {}", "Job:".bold().cyan(), job.task_name.bold());
    println!("{}", "─".repeat(72));
    println!("  {:<16} {}", "ID:".bold(), job.id);
    println!("  {:<16} {}", "Asset:".bold(), job.asset_id);
    println!("  {:<16} {}", "Status:".bold(), job_status(job.status));
    println!("  {:<16} {}", "Priority:".bold(), job.priority);
    if let Some(ref template) = job.template_action_set_id {
        println!("  {:<16} {}", "Template:".bold(), template);
    }
    if let Some(ref date) = job.scheduled_date {
        println!("  {:<16} {}", "Scheduled:".bold(), format_time(date));
    }
    if let Some(ref date) = job.start_date {
        println!("  {:<16} {}", "Started:".bold(), format_time(date));
    }
    if let Some(ref date) = job.end_date {
        println!("  {:<16} {}", "Ended:".bold(), format_time(date));
    }
    if let Some(ref notes) = job.completion_notes {
        println!("  {:<16} {}", "Notes:".bold(), notes);
    }

    println!();
    if tree.actions.is_empty() {
        println!("  {}", "No actions.".dimmed());
    }
    for entry in &tree.actions {
        let action = &entry.action;
        println!(
            "  {:>3}. {} [{}] {}",
            action.sequence_order,
            action.action_name.bold(),
            action_status(action.status),
            action.id.dimmed()
        );
        if let Some(hours) = action.billable_hours {
            println!("       billable hours: {:.2}", hours);
        }
        for demand in &entry.part_demands {
            println!(
                "       {} part {} x {} [{}] {}",
                "•".dimmed(),
                demand.part_id,
                demand.quantity_required,
                demand_status(demand.status),
                demand.id.dimmed()
            );
        }
        for tool in &entry.tools {
            println!(
                "       {} tool {} x {}{}",
                "•".dimmed(),
                tool.tool_id,
                tool.quantity_required,
                if tool.is_required { "" } else { " (optional)" }
            );
        }
    }

    if !tree.delays.is_empty() {
        println!();
        println!("  {}", "Delays".bold());
        for delay in &tree.delays {
            let window = match delay.delay_end_date {
                Some(ref end) => format!(
                    "{} to {}",
                    format_time(&delay.delay_start_date),
                    format_time(end)
                ),
                None => format!("since {}", format_time(&delay.delay_start_date)).yellow().to_string(),
            };
            println!(
                "    {} {}: {} ({}) {}",
                "•".dimmed(),
                delay.delay_type,
                delay.delay_reason,
                window,
                delay.id.dimmed()
            );
        }
    }

    println!("{}", "─".repeat(72));
    println!();
}

pub fn print_progress(job: &MaintenanceActionSet, progress: &JobProgress) {
    println!();
    println!(
        "{} {} [{}]",
        "Progress:".bold().cyan(),
        job.task_name.bold(),
        job_status(job.status)
    );
    println!(
        "  {:<18} {:.1}% ({} of {} completed)",
        "Completion:".bold(),
        progress.completion_percentage,
        progress.completed,
        progress.total
    );
    println!("  {:<18} {}", "In progress:".bold(), progress.in_progress);
    println!("  {:<18} {}", "Skipped:".bold(), progress.skipped);
    println!("  {:<18} {}", "Cancelled:".bold(), progress.cancelled);
    println!("  {:<18} {:.2}", "Billable hours:".bold(), progress.billable_hours);
    println!("  {:<18} {:.2}", "Delay hours:".bold(), progress.delay_hours);
    println!();
}

pub fn print_parts_summary(summary: &PartsSummary) {
    println!();
    println!("{}", "Parts".bold().cyan());
    println!("  {:<20} {}", "Demands:".bold(), summary.total_parts_needed);
    println!(
        "  {:<20} {}",
        "Available:".bold(),
        summary.parts_available.to_string().green()
    );
    let purchase = summary.parts_need_purchase.to_string();
    println!(
        "  {:<20} {}",
        "Need purchase:".bold(),
        if summary.parts_need_purchase > 0 {
            purchase.red().to_string()
        } else {
            purchase
        }
    );
    println!("  {:<20} {:.2}", "Estimated cost:".bold(), summary.estimated_cost);
    println!();
}

pub fn print_availability(availability: &PartAvailability) {
    let verdict = if availability.needs_purchase {
        format!("short by {}", availability.shortfall).red().to_string()
    } else {
        "in stock".green().to_string()
    };
    println!(
        "  part {} (stock {}): {}, estimated cost {:.2}",
        availability.part_id, availability.stock_level, verdict, availability.estimated_cost
    );
}

pub fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("{}", "No comments.".dimmed());
        return;
    }
    println!();
    for comment in comments {
        println!(
            "{} {}",
            format_time(&comment.created_at).dimmed(),
            comment.created_by.bold()
        );
        for line in comment.content.lines() {
            println!("    {}", line);
        }
    }
    println!();
}

pub fn print_template_list(templates: &[TemplateActionSet]) {
    if templates.is_empty() {
        println!("{}", "No templates.".dimmed());
        return;
    }

    println!();
    println!("{}", "Templates".bold().cyan());
    println!("{}", "─".repeat(80));
    println!(
        "  {:<38} {:<26} {:<10} {}",
        "ID".bold(),
        "TASK".bold(),
        "REVISION".bold(),
        "ACTIVE".bold()
    );
    println!("{}", "─".repeat(80));
    for template in templates {
        let active = if template.is_active {
            "yes".green().to_string()
        } else {
            "superseded".dimmed().to_string()
        };
        println!(
            "  {:<38} {:<26} {:<10} {}",
            template.id, template.task_name, template.revision, active
        );
    }
    println!();
}

pub fn print_template_detail(template: &LoadedTemplate, chain: &[TemplateActionSet]) {
    let set = &template.set;
    println!();
    println!(
        "{} {} (revision {})",
        "Template:".bold().cyan(),
        set.task_name.bold(),
        set.revision
    );
    println!("{}", "─".repeat(72));
    println!("  {:<16} {}", "ID:".bold(), set.id);
    if let Some(ref description) = set.description {
        println!("  {:<16} {}", "Description:".bold(), description);
    }
    if chain.len() > 1 {
        let labels: Vec<&str> = chain.iter().map(|s| s.revision.as_str()).collect();
        println!("  {:<16} {}", "Revisions:".bold(), labels.join(" <- "));
    }
    println!();
    for entry in &template.items {
        let item = &entry.item;
        println!(
            "  {:>3}. {}{}",
            item.sequence_order,
            item.action_name.bold(),
            if item.is_required {
                String::new()
            } else {
                " (optional)".dimmed().to_string()
            }
        );
        for demand in &entry.part_demands {
            println!(
                "       {} part {} x {}{}",
                "•".dimmed(),
                demand.part_id,
                demand.quantity_required,
                if demand.is_optional { " (optional)" } else { "" }
            );
        }
        for tool in &entry.tools {
            println!("       {} tool {} x {}", "•".dimmed(), tool.tool_id, tool.quantity_required);
        }
    }
    println!("{}", "─".repeat(72));
    println!();
}
