// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A 1-based page request, as received from API callers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Out of range values are replaced instead of rejected:
    /// page numbers below 1 become 1,
    /// page sizes outside of `1..=100` become the default size.
    #[must_use]
    pub const fn normalized(self) -> Self {
        let page_number = if self.page_number < 1 {
            1
        } else {
            self.page_number
        };
        let page_size = if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        };
        Self {
            page_number,
            page_size,
        }
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page_number.saturating_sub(1)) * u64::from(self.page_size)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 1, 10)]
    #[case(3, 101, 3, 10)]
    #[case(2, 100, 2, 100)]
    #[case(5, 1, 5, 1)]
    fn normalizes_out_of_range_requests(
        #[case] page_number: u32,
        #[case] page_size: u32,
        #[case] expected_number: u32,
        #[case] expected_size: u32,
    ) {
        let request = PageRequest {
            page_number,
            page_size,
        }
        .normalized();
        assert_eq!(request.page_number, expected_number);
        assert_eq!(request.page_size, expected_size);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let request = PageRequest {
            page_number: 3,
            page_size: 20,
        };
        assert_eq!(request.offset(), 40);

        let last = PageRequest {
            page_number: u32::MAX,
            page_size: 100,
        };
        assert_eq!(last.offset(), (u64::from(u32::MAX) - 1) * 100);
    }
}
