use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::intel::{ActionTrigger, IntelPacket, TrackedBillDirective};

lazy_static! {
    // Content may hold markdown links, so only the explicit terminator closes a packet
    static ref INTEL_PACKET: Regex =
        Regex::new(r"(?s)\[INTEL_PACKET:\s*([^|]*?)\s*\|\s*(.*?)\s*\|END_PACKET\]").unwrap();
    static ref INTEL_PACKET_OPEN: Regex = Regex::new(r"(?s)\[INTEL_PACKET:.*$").unwrap();

    static ref MEMBER_ACTION: Regex =
        Regex::new(r"\[CREATE_PAGE_ACTION:\s*([^|\]]*?)\s*\|\s*([^\]]*?)\s*\]").unwrap();
    static ref MEMBER_ACTION_OPEN: Regex = Regex::new(r"\[CREATE_PAGE_ACTION:[^\]]*$").unwrap();

    static ref BILL_ACTION: Regex =
        Regex::new(r"\[RESEARCH_BILL:\s*(\d+)\s*\|\s*([^|\]]*?)\s*\|\s*([^|\]]*?)\s*\]").unwrap();
    static ref BILL_ACTION_OPEN: Regex = Regex::new(r"\[RESEARCH_BILL:[^\]]*$").unwrap();

    static ref TRACK_BILL: Regex = Regex::new(
        r"\[TRACK_BILL:\s*(\d{1,4})\s*\|\s*([^|\]]*?)\s*\|\s*([^|\]]*?)\s*\|\s*([^\]]*?)\s*\]"
    )
    .unwrap();
    static ref TRACK_BILL_OPEN: Regex = Regex::new(r"\[TRACK_BILL:[^\]]*$").unwrap();
}

/// Remove every directive, complete or still open, from `text` and trim it.
///
/// The result is a pure function of its input, so it can be applied to the
/// whole buffer after each chunk or to stored history alike.
pub fn clean_display(text: &str) -> String {
    // Complete forms go before the open-ended ones of the same kind
    let patterns: [&Regex; 8] = [
        &INTEL_PACKET,
        &INTEL_PACKET_OPEN,
        &MEMBER_ACTION,
        &MEMBER_ACTION_OPEN,
        &BILL_ACTION,
        &BILL_ACTION_OPEN,
        &TRACK_BILL,
        &TRACK_BILL_OPEN,
    ];

    let mut cleaned = text.to_string();
    for pattern in patterns {
        if pattern.is_match(&cleaned) {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
    }
    cleaned.trim().to_string()
}

/// What a single scan of the buffer produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseUpdate {
    /// The buffer with all directives removed
    pub display: String,
    /// Packets completed since the previous scan, in buffer order
    pub packets: Vec<IntelPacket>,
    /// Tracked-bill directives completed since the previous scan
    pub tracked_bills: Vec<TrackedBillDirective>,
    /// Set only when the pending action trigger changed during this scan
    pub action: Option<ActionTrigger>,
}

/// Accumulates streamed assistant text and extracts directives from it.
///
/// One parser belongs to one request. Every scan looks at the whole buffer
/// because a directive can straddle any number of chunks.
#[derive(Debug, Default)]
pub struct StreamParser {
    buffer: String,
    processed: HashSet<String>,
    last_found: Option<ActionTrigger>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and scan the whole buffer
    pub fn push(&mut self, chunk: &str) -> ParseUpdate {
        self.buffer.push_str(chunk);
        self.scan()
    }

    /// Scan again without new input. Already emitted directives are not repeated.
    pub fn rescan(&mut self) -> ParseUpdate {
        self.scan()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn display_text(&self) -> String {
        clean_display(&self.buffer)
    }

    fn scan(&mut self) -> ParseUpdate {
        let mut packets = Vec::new();
        for caps in INTEL_PACKET.captures_iter(&self.buffer) {
            if self.processed.insert(caps[0].to_string()) {
                packets.push(IntelPacket::new(caps[1].trim(), caps[2].trim()));
            }
        }

        let mut tracked_bills = Vec::new();
        for caps in TRACK_BILL.captures_iter(&self.buffer) {
            let Ok(congress) = caps[1].parse::<u32>() else {
                continue;
            };
            if self.processed.insert(caps[0].to_string()) {
                tracked_bills.push(TrackedBillDirective {
                    congress,
                    bill_type: caps[2].trim().to_string(),
                    bill_number: caps[3].trim().to_string(),
                    title: caps[4].trim().to_string(),
                });
            }
        }

        // Bill is scanned after member, so it wins when both are present
        let mut found = None;
        if let Some(caps) = MEMBER_ACTION.captures_iter(&self.buffer).last() {
            found = Some(ActionTrigger::member(caps[1].trim(), caps[2].trim()));
        }
        if let Some(caps) = BILL_ACTION.captures_iter(&self.buffer).last() {
            found = Some(ActionTrigger::bill(&caps[1], &caps[2], &caps[3]));
        }

        let action = match found {
            Some(trigger) if self.last_found.as_ref() != Some(&trigger) => {
                self.last_found = Some(trigger.clone());
                Some(trigger)
            }
            _ => None,
        };

        ParseUpdate {
            display: clean_display(&self.buffer),
            packets,
            tracked_bills,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRIEFING: &str = "Senator Brown voted yea on the bill. \
        [INTEL_PACKET: Brown on HR 815 | Voted yea, see [roll call](https://clerk.house.gov/Votes/2024151) |END_PACKET] \
        Want to dig deeper? [RESEARCH_BILL: 118 | H.R. | 815]";

    fn feed(chunks: &[&str]) -> (StreamParser, Vec<IntelPacket>, Vec<ParseUpdate>) {
        let mut parser = StreamParser::new();
        let mut packets = Vec::new();
        let mut updates = Vec::new();
        for chunk in chunks {
            let update = parser.push(chunk);
            packets.extend(update.packets.clone());
            updates.push(update);
        }
        (parser, packets, updates)
    }

    /// The trigger a reply ends with: the last one any scan reported
    fn final_trigger(updates: &[ParseUpdate]) -> Option<ActionTrigger> {
        updates.iter().rev().find_map(|update| update.action.clone())
    }

    fn split_every(text: &str, size: usize) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars.chunks(size).map(|c| c.iter().collect()).collect()
    }

    #[test]
    fn test_packet_removed_from_display() {
        let (parser, packets, _) = feed(&["Hello [INTEL_PACKET: T | C |END_PACKET] world"]);
        assert_eq!(parser.display_text(), "Hello  world");
        assert_eq!(packets, vec![IntelPacket::new("T", "C")]);
    }

    #[test]
    fn test_packet_content_keeps_brackets() {
        let (parser, packets, _) = feed(&[BRIEFING]);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].title, "Brown on HR 815");
        assert_eq!(
            packets[0].content,
            "Voted yea, see [roll call](https://clerk.house.gov/Votes/2024151)"
        );
        assert!(!parser.display_text().contains("END_PACKET"));
        assert!(!parser.display_text().contains("RESEARCH_BILL"));
    }

    #[test]
    fn test_multiline_packet_content() {
        let (_, packets, _) = feed(&[
            "[INTEL_PACKET: Committee seats | - Finance\n- Banking\n|END_PACKET]",
        ]);
        assert_eq!(packets, vec![IntelPacket::new("Committee seats", "- Finance\n- Banking")]);
    }

    #[test]
    fn test_bill_trigger() {
        let (parser, _, updates) = feed(&["[RESEARCH_BILL: 118 | HR | 1234]"]);
        assert_eq!(
            final_trigger(&updates),
            Some(ActionTrigger::Bill {
                name: "HR 1234".to_string(),
                id: "118-hr-1234".to_string(),
                congress: "118".to_string(),
                bill_type: "hr".to_string(),
                bill_number: "1234".to_string(),
            })
        );
        assert_eq!(parser.display_text(), "");
    }

    #[test]
    fn test_member_trigger() {
        let (parser, _, updates) =
            feed(&["Open a page? [CREATE_PAGE_ACTION: Sherrod Brown | B000944]"]);
        let expected = ActionTrigger::member("Sherrod Brown", "B000944");
        assert_eq!(updates[0].action, Some(expected));
        assert_eq!(parser.display_text(), "Open a page?");
    }

    #[test]
    fn test_bill_wins_over_member() {
        let (_, _, updates) = feed(&[
            "[RESEARCH_BILL: 118 | S | 25] and [CREATE_PAGE_ACTION: Sherrod Brown | B000944]",
        ]);
        assert!(matches!(final_trigger(&updates), Some(ActionTrigger::Bill { .. })));
    }

    #[test]
    fn test_later_member_overwrites_earlier() {
        let (_, _, updates) = feed(&[
            "[CREATE_PAGE_ACTION: Sherrod Brown | B000944]",
            " or [CREATE_PAGE_ACTION: J. D. Vance | V000137]",
        ]);
        assert_eq!(
            final_trigger(&updates),
            Some(ActionTrigger::member("J. D. Vance", "V000137"))
        );
        assert!(updates[0].action.is_some());
        assert!(updates[1].action.is_some());
    }

    #[test]
    fn test_unterminated_packet_hidden_and_not_emitted() {
        let (parser, packets, _) = feed(&["Summary follows. [INTEL_PACKET: T | partial"]);
        assert!(packets.is_empty());
        assert_eq!(parser.display_text(), "Summary follows.");
    }

    #[test]
    fn test_open_tags_hidden_while_streaming() {
        let (_, _, updates) = feed(&[
            "See [CREATE_PAGE_ACTION: Sherrod",
            " Brown | B000944] then [RESEARCH_BILL: 118 | HR",
        ]);
        assert_eq!(updates[0].display, "See");
        assert_eq!(updates[1].display, "See  then");
    }

    #[test]
    fn test_malformed_bill_stays_visible() {
        let (parser, _, updates) = feed(&["[RESEARCH_BILL: one-eighteen | HR | 1]"]);
        assert_eq!(final_trigger(&updates), None);
        assert_eq!(parser.display_text(), "[RESEARCH_BILL: one-eighteen | HR | 1]");
    }

    #[test]
    fn test_packet_emitted_once_across_chunks() {
        let text = "Intro [INTEL_PACKET: Title | Body text |END_PACKET] outro";
        for size in 1..text.len() {
            let chunks = split_every(text, size);
            let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let (_, packets, _) = feed(&refs);
            assert_eq!(
                packets,
                vec![IntelPacket::new("Title", "Body text")],
                "chunk size {}",
                size
            );
        }
    }

    #[test]
    fn test_chunk_boundary_invariance() {
        let (whole, whole_packets, whole_updates) = feed(&[BRIEFING]);
        for size in [1, 2, 3, 7, 13, 64] {
            let chunks = split_every(BRIEFING, size);
            let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let (split, split_packets, split_updates) = feed(&refs);
            assert_eq!(split.display_text(), whole.display_text(), "chunk size {}", size);
            assert_eq!(split_packets, whole_packets, "chunk size {}", size);
            assert_eq!(final_trigger(&split_updates), final_trigger(&whole_updates));
        }
    }

    #[test]
    fn test_rescan_emits_nothing_new() {
        let mut parser = StreamParser::new();
        let first = parser.push(BRIEFING);
        assert_eq!(first.packets.len(), 1);
        assert!(first.action.is_some());

        let again = parser.rescan();
        assert!(again.packets.is_empty());
        assert!(again.action.is_none());
        assert_eq!(again.display, first.display);
    }

    #[test]
    fn test_duplicate_packet_text_emitted_once() {
        let packet = "[INTEL_PACKET: T | C |END_PACKET]";
        let (_, packets, _) = feed(&[packet, " ", packet]);
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn test_final_trigger_independent_of_chunking() {
        let text = "Open? [CREATE_PAGE_ACTION: Sherrod Brown | B000944] \
            or [RESEARCH_BILL: 118 | HR | 815]";
        let (_, _, whole) = feed(&[text]);
        assert_eq!(whole.iter().filter(|u| u.action.is_some()).count(), 1);

        for size in [1, 5, 40, 60] {
            let chunks = split_every(text, size);
            let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let (_, _, split) = feed(&refs);
            assert_eq!(final_trigger(&split), final_trigger(&whole), "chunk size {}", size);
        }
        assert_eq!(final_trigger(&whole), Some(ActionTrigger::bill("118", "HR", "815")));
    }

    #[test]
    fn test_unchanged_trigger_reported_once() {
        let (_, _, updates) = feed(&[
            "[CREATE_PAGE_ACTION: Sherrod Brown | B000944]",
            " more text",
            " and more",
        ]);
        assert!(updates[0].action.is_some());
        assert!(updates[1].action.is_none());
        assert!(updates[2].action.is_none());
    }

    #[test]
    fn test_oversized_congress_in_track_bill_stays_visible() {
        let text = "x [TRACK_BILL: 99999999999 | HR | 1 | T]";
        let (parser, _, updates) = feed(&[text]);
        assert!(updates[0].tracked_bills.is_empty());
        assert_eq!(parser.display_text(), text);
    }

    #[test]
    fn test_tracked_bill_directive() {
        let (parser, _, updates) = feed(&[
            "Now tracking. [TRACK_BILL: 118 | HR | 2882 | Further Consolidated ",
            "Appropriations Act]",
        ]);
        assert!(updates[0].tracked_bills.is_empty());
        assert_eq!(
            updates[1].tracked_bills,
            vec![TrackedBillDirective {
                congress: 118,
                bill_type: "HR".to_string(),
                bill_number: "2882".to_string(),
                title: "Further Consolidated Appropriations Act".to_string(),
            }]
        );
        assert_eq!(parser.display_text(), "Now tracking.");
    }

    #[test]
    fn test_clean_display_on_stored_history() {
        let stored = "Status update.\n\n*Accessing information from Congress.gov...*\n\n\
            [INTEL_PACKET: T | C |END_PACKET]";
        assert_eq!(
            clean_display(stored),
            "Status update.\n\n*Accessing information from Congress.gov...*"
        );
    }

    #[test]
    fn test_plain_brackets_untouched() {
        let text = "See [the summary](https://congress.gov/bill/118th-congress/house-bill/815).";
        assert_eq!(clean_display(text), text);
    }
}
