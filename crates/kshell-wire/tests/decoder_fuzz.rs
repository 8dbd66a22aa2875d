// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Mutate valid KTP frames and ensure decoding never panics.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::panic::{catch_unwind, AssertUnwindSafe};

use kshell_wire::{Command, Frame, Framer, Message, ParamType, Status, HEADER_LEN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_LEN: u32 = 64 * 1024;

#[test]
fn fuzz_decode_never_panics() {
    let iterations = std::env::var("KSHELL_FUZZ_ITERS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1024);
    let mut rng = StdRng::seed_from_u64(0x4b54_5020_u64);

    for _ in 0..iterations {
        let mut frame = random_message(&mut rng).serialize().unwrap();
        mutate_frame(&mut rng, &mut frame);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _ = Message::deserialize(&frame, MAX_LEN);
            feed_framer(&frame);
        }));
        assert!(result.is_ok(), "decoder panicked on mutated frame");
    }
}

#[test]
fn unmutated_frames_decode() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..128 {
        let frame = random_message(&mut rng).serialize().unwrap();
        let decoded = Message::deserialize(&frame, MAX_LEN).unwrap();
        assert_eq!(decoded.serialize().unwrap(), frame);
    }
}

fn feed_framer(bytes: &[u8]) {
    let mut framer = Framer::new(MAX_LEN);
    let mut offset = 0;
    loop {
        let need = framer.expected();
        let Some(chunk) = bytes.get(offset..offset + need) else {
            return;
        };
        offset += need;
        match framer.push(chunk) {
            Err(_) => return,
            Ok(Frame::Pending | Frame::Complete(_) | Frame::Malformed(_)) => {}
        }
    }
}

fn random_message<R: Rng>(rng: &mut R) -> Message {
    let cmds = [
        Command::Cmd,
        Command::CmdAck,
        Command::Completion,
        Command::CompletionAck,
        Command::Help,
        Command::HelpAck,
        Command::Auth,
        Command::Other(rng.gen()),
    ];
    let status = if rng.gen_bool(0.2) {
        Status::ERROR
    } else {
        Status::NONE
    };
    let mut msg = Message::new(cmds[rng.gen_range(0..cmds.len())], status).with_req_id(rng.gen());
    for _ in 0..rng.gen_range(0..4) {
        match rng.gen_range(0..3) {
            0 => {
                msg.add_retcode(rng.gen());
            }
            1 => {
                let len = rng.gen_range(0..32);
                let text: String = (0..len)
                    .map(|_| char::from(rng.gen_range(b' '..=b'~')))
                    .collect();
                msg.add_str(ParamType::Line, &text);
            }
            _ => {
                let len = rng.gen_range(0..16);
                let mut data = vec![0u8; len];
                rng.fill_bytes(&mut data);
                msg.add_param(ParamType::Other(rng.gen()), data);
            }
        }
    }
    msg
}

fn mutate_frame<R: Rng>(rng: &mut R, frame: &mut Vec<u8>) {
    match rng.gen_range(0..4) {
        0 => {
            let declared: u32 = rng.gen();
            frame[20..24].copy_from_slice(&declared.to_be_bytes());
        }
        1 => {
            let param_num: u32 = rng.gen();
            frame[16..20].copy_from_slice(&param_num.to_be_bytes());
        }
        2 => {
            if frame.len() > HEADER_LEN + 1 {
                let new_len = rng.gen_range(HEADER_LEN..frame.len());
                frame.truncate(new_len);
                if rng.gen_bool(0.5) {
                    frame[20..24].copy_from_slice(&(new_len as u32).to_be_bytes());
                }
            }
        }
        _ => {
            let index = rng.gen_range(0..frame.len());
            frame[index] ^= rng.gen::<u8>() | 1;
        }
    }
}
