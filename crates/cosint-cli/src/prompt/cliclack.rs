use std::io::{self, Write};

use anyhow::Result;
use bat::WrappingMode;
use cliclack::{confirm, input, spinner};
use console::style;
use cosint::models::intel::IntelPacket;
use cosint::models::message::{ChatMessage, Role};

use super::{Input, InputType, Prompt, Theme};

pub struct CliclackPrompt {
    spinner: Option<cliclack::ProgressBar>,
    input_mode: InputMode,
    theme: Theme,
}

enum InputMode {
    Singleline,
    Multiline,
}

impl CliclackPrompt {
    pub fn new() -> Self {
        CliclackPrompt {
            spinner: None,
            input_mode: InputMode::Singleline,
            theme: Theme::Dark,
        }
    }
}

pub fn print_markdown(content: &str, theme: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(theme)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print();
    if printed.is_err() {
        println!("{}", content);
    }
}

fn print_packet(packet: &IntelPacket, theme: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(
            bat::Input::from_bytes(packet.content.as_bytes())
                .name(format!("Intel: {}", packet.title)),
        )
        .theme(theme)
        .language("Markdown")
        .grid(true)
        .header(true)
        .wrapping_mode(WrappingMode::Character)
        .print();
    if printed.is_err() {
        println!("Intel: {}\n{}", packet.title, packet.content);
    }
}

impl Prompt for CliclackPrompt {
    fn render(&mut self, message: &ChatMessage) {
        match message.role {
            Role::Human => println!("{} {}", style(">").cyan(), message.content),
            Role::Assistant if message.content.is_empty() => return,
            Role::Assistant => {
                print_markdown(&message.content, self.theme.bat_theme());
                println!();
            }
        }
        let _ = io::stdout().flush();
    }

    fn render_markdown(&mut self, content: &str) {
        print_markdown(content, self.theme.bat_theme());
        println!();
    }

    fn render_packet(&mut self, packet: &IntelPacket) {
        print_packet(packet, self.theme.bat_theme());
    }

    fn notice(&mut self, text: &str) {
        println!("{}", style(text).dim());
    }

    fn get_input(&mut self) -> Result<Input> {
        let mut input = input("COSINT:               [Help: /?]").placeholder("");
        if let InputMode::Multiline = self.input_mode {
            input = input.multiline();
        }
        let message_text: String = input.interact()?;
        let message_text = message_text.trim().to_string();

        if message_text.eq_ignore_ascii_case("/exit") || message_text.eq_ignore_ascii_case("/quit")
        {
            return Ok(Input {
                input_type: InputType::Exit,
                content: None,
            });
        } else if message_text.eq_ignore_ascii_case("/new") {
            return Ok(Input {
                input_type: InputType::NewChat,
                content: None,
            });
        } else if message_text.eq_ignore_ascii_case("/m") {
            self.input_mode = InputMode::Multiline;
        } else if message_text.eq_ignore_ascii_case("/s") {
            self.input_mode = InputMode::Singleline;
        } else if message_text.eq_ignore_ascii_case("/t") {
            self.theme = match self.theme {
                Theme::Light => {
                    println!("Switching to Dark theme");
                    Theme::Dark
                }
                Theme::Dark => {
                    println!("Switching to Light theme");
                    Theme::Light
                }
            };
        } else if message_text.eq_ignore_ascii_case("/?") {
            println!("Commands:");
            println!("/exit - Exit the session");
            println!("/new - Start a new conversation");
            println!("/m - Switch to multiline input mode");
            println!("/s - Switch to singleline input mode");
            println!("/t - Toggle Light/Dark theme");
            println!("/? - Display this help message");
            println!("Ctrl+C - Stop the current reply");
        } else {
            return Ok(Input {
                input_type: InputType::Message,
                content: Some(message_text),
            });
        }

        Ok(Input {
            input_type: InputType::AskAgain,
            content: None,
        })
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(confirm(question).initial_value(true).interact()?)
    }

    fn show_busy(&mut self) {
        let spin = spinner();
        spin.start("awaiting reply");
        self.spinner = Some(spin);
    }

    fn hide_busy(&mut self) {
        if let Some(spin) = self.spinner.take() {
            spin.stop("");
        }
    }

    fn close(&self) {
        // No cleanup required
    }
}
