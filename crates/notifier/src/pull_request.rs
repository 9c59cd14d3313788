/// 从 PR 地址列表中取出第一个 `/pull/<n>` 的编号
///
/// CI 提供的列表以逗号分隔，例如
/// `https://github.com/org/repo/pull/12,https://github.com/org/repo/pull/13`。
pub fn pr_number_from_urls(raw: &str) -> Option<u64> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|url| !url.is_empty())
        .find_map(|url| {
            let (_, rest) = url.split_once("/pull/")?;
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
}
