use anyhow::Result;
use cosint::models::intel::IntelPacket;
use cosint::models::message::ChatMessage;

pub mod cliclack;

pub trait Prompt {
    fn render(&mut self, message: &ChatMessage);
    fn render_packet(&mut self, packet: &IntelPacket);
    fn render_markdown(&mut self, content: &str);
    fn notice(&mut self, text: &str);
    fn get_input(&mut self) -> Result<Input>;
    fn confirm(&mut self, question: &str) -> Result<bool>;
    fn show_busy(&mut self);
    fn hide_busy(&mut self);
    fn close(&self);
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Only set for messages
}

pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    NewChat,  // Start a fresh conversation
    Exit,     // User wants to exit the session
}

pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn bat_theme(&self) -> &'static str {
        match self {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }
}
