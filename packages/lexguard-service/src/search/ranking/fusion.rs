/// Borda count: each ranking awards `n - position` points; ties keep the lower index first.
pub fn borda_fuse(rankings: &[Vec<usize>], n: usize) -> Vec<usize> {
	let mut points = vec![0usize; n];

	for ranking in rankings {
		for (position, idx) in ranking.iter().enumerate() {
			if let Some(slot) = points.get_mut(*idx) {
				*slot += n.saturating_sub(position);
			}
		}
	}

	let mut order: Vec<usize> = (0..n).collect();

	order.sort_by(|a, b| points[*b].cmp(&points[*a]));

	order
}
