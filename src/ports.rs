//! MIDI port listing for `--list-ports`

use anyhow::Result;
use colored::*;
use midir::{MidiInput, MidiOutput};

use crate::config::APP_NAME;

/// Names of the ports midir can see, inputs then outputs
pub fn discover_ports() -> Result<(Vec<String>, Vec<String>)> {
    let probe_name = format!("{}-probe", APP_NAME);

    let midi_in = MidiInput::new(&probe_name)?;
    let inputs = midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect();

    let midi_out = MidiOutput::new(&probe_name)?;
    let outputs = midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect();

    Ok((inputs, outputs))
}

/// Whether a port belongs to a client with the given name
fn is_own_port(port: &str, client_name: &str) -> bool {
    port.starts_with(client_name)
}

fn print_section(title: &str, ports: &[String], client_name: &str) {
    println!("\n{}", title.bold());
    if ports.is_empty() {
        println!("  {}", "No ports found".dimmed());
        return;
    }
    for port in ports {
        let marker = if is_own_port(port, client_name) {
            "[OWN]".yellow()
        } else {
            "[PORT]".green()
        };
        println!("  {} {}", marker, port);
    }
}

/// Print every visible port; ports of `client_name` are marked
pub fn list_ports_formatted(client_name: &str) -> Result<()> {
    let (inputs, outputs) = discover_ports()?;

    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());
    print_section("Input Ports:", &inputs, client_name);
    print_section("Output Ports:", &outputs, client_name);
    println!();

    Ok(())
}
